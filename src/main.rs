use perf_sharding::{clean_logger, cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let res = cli::run().await;
    if let Err(err) = res {
        clean_logger();
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
