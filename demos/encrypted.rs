use std::env;

use ftp_toolkit::{Connection, FtpClient, FtpConfig, ListOptions};
use openssl::ssl::{SslConnector, SslMethod};

fn main() {
    env_logger::init();
    let mut builder = SslConnector::builder(SslMethod::tls()).unwrap();
    // a self signed server certificate has to be trusted explicitly
    if let Ok(ca_file) = env::var("FTP_CA_FILE") {
        builder.set_ca_file(ca_file).unwrap();
    }

    let connection = Connection::secure("localhost", 21, "anonymous", "anonymous@", builder.build());
    let result = FtpClient::connect(&connection, FtpConfig::default())
        .and_then(|mut client| client.list_dir_details("/", &ListOptions::default()).map(|listing| (client, listing)));
    match result {
        Ok((client, listing)) => {
            for entry in listing.values() {
                println!("{} {:>10} {}", entry.permissions, entry.size, entry.path);
            }
            let _ = client.quit();
        }
        Err(err) => panic!("{}", err),
    }
}
