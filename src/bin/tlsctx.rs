use anyhow::Result;

fn main() -> Result<()> {
    tlsctx::cli::start::start()
}
