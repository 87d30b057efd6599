//! Build log follower example
//!
//! Prints the log of one build step as it is written, then shows how the
//! stream ended.
//!
//! Reads `DRONE_SERVER`, `DRONE_TOKEN` and `DRONE_CSRF` from the environment.
//!
//! Run with: cargo run --example follow_logs -- octocat hello-world 42 2

use drone_client::{CloseReason, DroneClient};
use serde_json::Value;

#[tokio::main]
async fn main() -> drone_client::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [owner, repo, build, proc] = args.as_slice() else {
        eprintln!("usage: follow_logs <owner> <repo> <build> <proc>");
        std::process::exit(2);
    };
    let (Ok(build), Ok(proc)) = (build.parse::<u64>(), proc.parse::<u64>()) else {
        eprintln!("build and proc must be numbers");
        std::process::exit(2);
    };

    println!("Drone Log Follower Example");
    println!("==========================\n");

    let client = DroneClient::from_environ().with_error_sink(|failure| {
        if failure.is_unauthorized() {
            eprintln!("Not authorized, check DRONE_TOKEN");
        }
    });

    let build_info = client.get_build(owner, repo, build).await?;
    if let Some(info) = build_info.as_json() {
        println!("Build #{} ({})\n", build, info["status"].as_str().unwrap_or("unknown"));
    }

    let logs = client.stream_logs(owner, repo, build, proc, |line: Value| {
        print!("{}", line["out"].as_str().unwrap_or_default());
    });

    match logs.closed().await {
        CloseReason::EndOfStream => println!("\n-- end of log --"),
        CloseReason::Failed => println!("\n-- log stream failed --"),
        CloseReason::ClosedByCaller => println!("\n-- closed --"),
    }

    Ok(())
}
