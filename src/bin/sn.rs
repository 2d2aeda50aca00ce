//! Short binary name (`sn`) that forwards to the `sheet_notes` library.
//! Keeping the alias as a real binary avoids shell alias requirements.

fn main() {
    sheet_notes::logging::init();
    if let Err(err) = sheet_notes::entry() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
