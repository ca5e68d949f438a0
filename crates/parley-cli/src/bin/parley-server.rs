//! `parley-server [PORT|ADDR] [--websocket]`

use parley::{LogTarget, ParleyServer, init_tracing};
use parley_cli::ServerArgs;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match ServerArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{}", ServerArgs::USAGE);
            std::process::exit(2);
        }
    };

    init_tracing("info", LogTarget::Stdout);
    tracing::info!(addr = %args.addr, websocket = args.websocket, "starting parley server");

    let builder = ParleyServer::builder().bind(&args.addr);

    if args.websocket {
        #[cfg(feature = "websocket")]
        {
            builder.build_websocket().await?.run().await?;
            return Ok(());
        }
        #[cfg(not(feature = "websocket"))]
        {
            eprintln!("this build has no WebSocket support (enable the `websocket` feature)");
            std::process::exit(2);
        }
    }

    builder.build().await?.run().await?;
    Ok(())
}
