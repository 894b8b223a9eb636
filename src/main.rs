fn main() {
    if let Err(err) = csv_geolink::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
