use std::env;
use std::io::{self, BufRead, Write};

use order_gateway::config::GatewayConfig;
use order_gateway::upstream::{UpstreamClient, CREATE_ORDER_PATH};
use order_gateway::{
    amount_or_default, auth_header, Credentials, OrderPayload, RequestParts, DEFAULT_ACCOUNT,
    DEFAULT_CONCEPT, DEFAULT_EMAIL, DEFAULT_NAME, DEFAULT_PHONE,
};

fn prompt(label: &str, default: &str) -> String {
    if default.is_empty() {
        print!("{label}: ");
    } else {
        print!("{label} [{default}]: ");
    }
    io::stdout().flush().expect("flush stdout");
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .expect("read stdin");
    let answer = line.trim();
    if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    }
}

/// Resolves the pre-built token: environment first (with confirmation),
/// then a manual prompt. Empty means no token yet.
fn resolve_auth_token() -> String {
    let env_token = env::var("HMAC_AUTH")
        .or_else(|_| env::var("DYNAMICORE_AUTH"))
        .unwrap_or_default();
    if !env_token.is_empty() {
        let usar = prompt("¿Usar HMAC_AUTH de variable de entorno?", "s");
        if usar.eq_ignore_ascii_case("s") {
            return env_token;
        }
    }
    prompt("Authorization (HMAC)", "")
}

fn prompt_order() -> OrderPayload {
    println!("\n==================================================");
    println!("  Crear orden - API Conekta / Dynamicore");
    println!("==================================================\n");

    let amount_str = prompt("Monto (amount)", "18.0");
    OrderPayload {
        amount: amount_or_default(amount_str.parse::<f64>().ok()),
        name: prompt("Nombre (name)", DEFAULT_NAME),
        phone: prompt("Teléfono (phone)", DEFAULT_PHONE),
        email: prompt("Email (email)", DEFAULT_EMAIL),
        concept: prompt("Concepto (concept)", DEFAULT_CONCEPT),
        account: prompt("Cuenta (account)", DEFAULT_ACCOUNT),
    }
}

#[tokio::main]
async fn main() {
    let token = resolve_auth_token();
    let data = prompt_order();

    let body = match serde_json::to_string(&data) {
        Ok(body) => body,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let parts = RequestParts::post(CREATE_ORDER_PATH, body);

    // Without a pre-built token the request can still be signed locally
    // from the client key and secret hash.
    let token = if token.is_empty() {
        let creds = Credentials {
            client_key: prompt("Client Key", ""),
            secret_hash: prompt("Secret Hash", ""),
        };
        if creds.client_key.is_empty() && creds.secret_hash.is_empty() {
            eprintln!("Falta el token de autorización.");
            std::process::exit(1);
        }
        auth_header(&parts, &creds)
    } else {
        token
    };

    let config = GatewayConfig::from_env();
    println!("\nEnviando petición...");
    println!("URL: {}{}", config.upstream_url, CREATE_ORDER_PATH);
    println!(
        "Body: {}",
        serde_json::to_string_pretty(&data).unwrap_or_else(|_| "{}".to_string())
    );

    let client = UpstreamClient::new(config.upstream_url);
    let result = client.send(&parts, &token).await;

    if let Some(error) = &result.error {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }

    println!("\n--- Respuesta ---");
    println!("Status: {}", result.status);
    match result.json_body() {
        Some(json) => println!(
            "Body: {}",
            serde_json::to_string_pretty(&json).unwrap_or(result.body)
        ),
        None => println!("Body: {}", result.body),
    }
}
