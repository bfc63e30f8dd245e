pub fn run() -> anyhow::Result<()> {
    println!("modelmeter {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
