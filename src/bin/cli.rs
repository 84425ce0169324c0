use clap::{App, Arg, SubCommand};
use fragbus::{FragbusError, Result, SegmentConfig, SegmentManager};

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("fragbus-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Fragbus Shared Memory Segment CLI Tool")
        .subcommand(
            SubCommand::with_name("create")
                .about("Create a segment and print its initial state")
                .arg(
                    Arg::with_name("key")
                        .short("k")
                        .long("key")
                        .value_name("KEY")
                        .help("Segment key (decimal or 0x-prefixed hex)")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("buffers")
                        .short("b")
                        .long("buffers")
                        .value_name("COUNT")
                        .help("Number of buffers")
                        .default_value("16")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("size")
                        .short("s")
                        .long("size")
                        .value_name("SIZE")
                        .help("Buffer size in bytes")
                        .default_value("4096")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("rank")
                        .short("r")
                        .long("rank")
                        .value_name("RANK")
                        .help("Diagnostic rank recorded in the header")
                        .default_value("-1")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("dump")
                .about("Attach to an existing segment and dump its state")
                .arg(
                    Arg::with_name("key")
                        .short("k")
                        .long("key")
                        .value_name("KEY")
                        .help("Segment key (decimal or 0x-prefixed hex)")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("stats")
                .about("Show ready counts for an existing segment")
                .arg(
                    Arg::with_name("key")
                        .short("k")
                        .long("key")
                        .value_name("KEY")
                        .help("Segment key (decimal or 0x-prefixed hex)")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("overwrite")
                        .long("overwrite")
                        .help("Count write-ready buffers as an overwriting producer would"),
                ),
        )
        .subcommand(SubCommand::with_name("info").about("Show version information"))
        .get_matches();

    match matches.subcommand() {
        ("create", Some(create_matches)) => {
            let key = parse_key(create_matches.value_of("key").unwrap())?;
            let buffers: usize = parse_number(create_matches.value_of("buffers").unwrap(), "buffers")?;
            let size: usize = parse_number(create_matches.value_of("size").unwrap(), "size")?;
            let rank: i32 = create_matches
                .value_of("rank")
                .unwrap()
                .parse()
                .map_err(|_| FragbusError::invalid_parameter("rank", "Invalid rank format"))?;

            let manager =
                SegmentManager::attach(SegmentConfig::new(key, buffers, size).with_rank(rank))?;
            if !manager.is_creator() {
                println!("Segment {:#x} already existed; attached as manager {}", key, manager.manager_id());
            }
            println!("{}", manager);
            Ok(())
        }
        ("dump", Some(dump_matches)) => {
            let key = parse_key(dump_matches.value_of("key").unwrap())?;
            let manager = attach_existing(key)?;
            println!("{}", manager);
            Ok(())
        }
        ("stats", Some(stats_matches)) => {
            let key = parse_key(stats_matches.value_of("key").unwrap())?;
            let overwrite = stats_matches.is_present("overwrite");
            let manager = attach_existing(key)?;
            println!("Segment {:#x}:", key);
            println!("  read-ready buffers:  {}", manager.read_ready_count());
            println!(
                "  write-ready buffers: {}",
                manager.write_ready_count(overwrite)
            );
            println!("  buffers owned here:  {:?}", manager.buffers_owned());
            Ok(())
        }
        ("info", Some(_)) => {
            println!("fragbus v{}", fragbus::VERSION);
            println!("Shared-memory fragment exchange for DAQ pipelines");
            Ok(())
        }
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn attach_existing(key: u32) -> Result<SegmentManager> {
    // Geometry is ignored on attach; the header is authoritative.
    SegmentManager::attach(SegmentConfig::new(key, 1, 1).with_create(false))
}

fn parse_key(raw: &str) -> Result<u32> {
    let parsed = if let Some(hex) = raw.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else {
        raw.parse()
    };
    parsed.map_err(|_| FragbusError::invalid_parameter("key", "Invalid key format"))
}

fn parse_number(raw: &str, parameter: &str) -> Result<usize> {
    raw.parse()
        .map_err(|_| FragbusError::invalid_parameter(parameter, "Invalid number format"))
}
