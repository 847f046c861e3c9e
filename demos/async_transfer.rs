use std::env;

use ftp_toolkit::{Connection, FtpClient, FtpConfig, Result};

fn transfer(host: &str, remote: &str, local: &str) -> Result<()> {
    let config = FtpConfig::default().with_progress_interval(1);
    let connection = Connection::anonymous(host, 21);
    let mut client = FtpClient::connect(&connection, config)?;
    println!("connected to {}", client.system()?);

    let size = client.size(remote)?;
    println!("{} is {} bytes", remote, size);
    let moved = client.async_download(remote, local, true, |progress| {
        println!(
            "{:>4}s {:>3}% {:>8.2} kB/s (+{} kB)",
            progress.elapsed_seconds, progress.percentage, progress.speed_kbps, progress.transferred_delta_kb
        );
    })?;
    println!("received {} bytes into {}", moved, local);

    client.quit()
}

fn main() {
    env_logger::init();
    let mut args = env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let remote = args.next().unwrap_or_else(|| "/pub/README".to_string());
    let local = args.next().unwrap_or_else(|| "README".to_string());
    transfer(&host, &remote, &local).unwrap_or_else(|err| panic!("{}", err));
}
