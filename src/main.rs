use shape_lab::{AppConfig, run};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(AppConfig::from_env()) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
