use std::process;

use timepage::{Responder, ResponderConfig};

fn main() {
    let config = ResponderConfig::default();
    let port = config.server.addr.port();

    let responder = match Responder::bind(config) {
        Ok(responder) => responder,
        Err(err) => {
            eprintln!("could not bind port {}: {}", port, err);
            process::exit(1);
        }
    };

    println!("Server running at http://localhost:{}", port);
    println!("Press Ctrl+C to stop the server");

    responder.serve_forever();
}
