//! Accepts one connection at a time and prints the parsed request.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;
use tokio::net::TcpListener;

use tcp_http::config::LimitsConfig;
use tcp_http::http::{read_request, Request};
use tcp_http::net::ReadBuffer;
use tcp_http::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "tcplistener", about = "Print HTTP requests received over TCP")]
struct Cli {
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    host: IpAddr,

    #[arg(short, long, default_value_t = 42069)]
    port: u16,

    /// Longest request line or field line, in bytes, that will be buffered.
    #[arg(long, default_value_t = LimitsConfig::default().max_buffer_size)]
    max_buffer_size: usize,

    /// Largest accepted request body, in bytes.
    #[arg(long, default_value_t = LimitsConfig::default().max_body_size)]
    max_body_size: usize,
}

fn print_request(request: &Request) {
    let line = request.request_line();
    println!("Request line:");
    println!("- Method: {}", line.method());
    println!("- Target: {}", line.target());
    println!("- Version: {}", line.http_version());
    println!("Headers:");
    request.headers().for_each(|name, value| println!("- {}: {}", name, value));
    println!("Body:");
    println!("{}", String::from_utf8_lossy(request.body()));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init("info")?;

    let listener = TcpListener::bind(SocketAddr::new(cli.host, cli.port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening");

    let initial = LimitsConfig::default().initial_buffer_size;
    loop {
        let (mut stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                continue;
            }
        };
        tracing::info!(peer_addr = %peer_addr, "Connection accepted");

        let mut buffer = ReadBuffer::new(initial, cli.max_buffer_size);
        match read_request(&mut stream, &mut buffer, cli.max_body_size).await {
            Ok(request) => print_request(&request),
            Err(e) => tracing::error!(peer_addr = %peer_addr, error = %e, "Failed to read request"),
        }
    }
}
