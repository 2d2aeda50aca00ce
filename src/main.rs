fn main() {
    sheet_notes::logging::init();
    if let Err(err) = sheet_notes::entry() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
