use ironweave::run_from_env;

fn main() {
    ironweave::logging::init_tracing();
    if let Err(err) = run_from_env() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
