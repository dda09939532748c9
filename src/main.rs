use env_logger::Env;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = rddprep::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
