//! Print a bcrypt hash for ADMIN_PASSWORD_HASH.
//!
//! Usage: hash-password <PASSWORD>   (or pipe the password on stdin)

use bcrypt::{hash, DEFAULT_COST};
use eshrm_backend::routes::users::MIN_PASSWORD_LENGTH;
use std::io::BufRead;

fn read_password() -> Option<String> {
    if let Some(arg) = std::env::args().nth(1) {
        return Some(arg);
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).ok()?;
    let line = line.trim_end_matches(['\r', '\n']).to_string();
    (!line.is_empty()).then_some(line)
}

fn main() {
    let Some(password) = read_password() else {
        eprintln!("Usage: hash-password <PASSWORD>");
        std::process::exit(1);
    };
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        eprintln!("Password must be at least {} characters", MIN_PASSWORD_LENGTH);
        std::process::exit(1);
    }

    match hash(&password, DEFAULT_COST) {
        Ok(hashed) => {
            println!("# Paste this into your .env:");
            println!("ADMIN_PASSWORD_HASH={}", hashed);
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
