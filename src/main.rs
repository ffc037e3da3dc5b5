use cosmos::CosmosConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = CosmosConfig::load()
        .map_err(cosmos::AppError::from)
        .and_then(cosmos::run);

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
