use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("zipwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: zipwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("ZIPWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: serial={}, async={}, socket={}, cli=true",
        cfg!(feature = "serial"),
        cfg!(feature = "async"),
        cfg!(unix)
    );
    println!(
        "protocol: sync=AA55 max_payload={} crc=CRC-16/CCITT-FALSE",
        zipwire_frame::MAX_PAYLOAD
    );

    Ok(SUCCESS)
}
