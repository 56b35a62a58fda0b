use std::process;

fn main() {
    if let Err(err) = table_recon::run() {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}
