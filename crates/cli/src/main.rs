fn main() -> Result<(), Box<dyn std::error::Error>> {
    getsmart_cli::run()
}
