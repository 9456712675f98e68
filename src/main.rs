fn main() {
    #[cfg(feature = "cli")]
    dsvcodec::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("dsvcodec: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
