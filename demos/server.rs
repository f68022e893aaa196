//
//  Sample application.
//
//  Listens on localhost:4918, plain http, no ssl.
//  Try it with:
//
//    curl -X PATCH -H 'X-Update-Range: append' \
//      -H 'Content-Type: application/x-sabredav-partialupdate' \
//      --data-binary 'more' http://localhost:4918/hello.txt
//

use std::error::Error;
use std::net::SocketAddr;
use std::str::FromStr;

use clap::Parser;
use futures_util::future::TryFutureExt;

use dav_patch::{body::Body, DavHandler, DavPath, FileSystem, MemFs};

#[derive(Clone)]
struct Server {
    dh: DavHandler,
}

impl Server {
    pub fn new(directory: String, prefix: String) -> Result<Self, Box<dyn Error>> {
        let fs = if !directory.is_empty() {
            FileSystem::local(directory)
        } else {
            // an in-memory filesystem with one file to play with.
            let memfs = MemFs::new();
            memfs.create_file(&DavPath::new("/hello.txt")?, "hello, world\n".into())?;
            FileSystem::Custom(memfs)
        };
        let dh = DavHandler::builder(fs).strip_prefix(prefix).build();
        Ok(Server { dh })
    }

    async fn handle(
        &self,
        req: hyper::Request<hyper::Body>,
    ) -> Result<hyper::Response<Body>, hyper::Error> {
        Ok(self.dh.handle(req).await)
    }
}

#[derive(Debug, clap::Parser)]
#[command(about, version)]
struct Cli {
    /// port to listen on
    #[arg(short, long, default_value = "4918")]
    port: u16,
    /// local directory to serve
    #[arg(short, long)]
    dir: Option<String>,
    /// url prefix to strip off
    #[arg(long, default_value = "")]
    prefix: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let Cli { port, dir, prefix } = Cli::parse();

    let (dir, name) = match dir.as_ref() {
        Some(dir) => (dir.as_str(), dir.as_str()),
        None => ("", "memory filesystem"),
    };

    let dav_server = Server::new(dir.into(), prefix)?;
    let make_service = hyper::service::make_service_fn(|_| {
        let dav_server = dav_server.clone();
        async move {
            let func = move |req| {
                let dav_server = dav_server.clone();
                async move { dav_server.handle(req).await }
            };
            Ok::<_, hyper::Error>(hyper::service::service_fn(func))
        }
    });

    let addr = format!("0.0.0.0:{}", port);
    let addr = SocketAddr::from_str(&addr)?;

    let server = hyper::Server::try_bind(&addr)?
        .serve(make_service)
        .map_err(|e| eprintln!("server error: {}", e));

    println!("Serving {} on {}", name, port);
    let _ = server.await;
    Ok(())
}
