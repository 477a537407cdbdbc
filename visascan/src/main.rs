use std::{io::Write, process::exit, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;

use visaplug::{
    Plug, PlugConfig, ResourceManager, SerialResourceManager, TcpIpResourceManager, VisaError,
    VisaPlug, find_devices,
};

/// List VISA instruments by their identification and talk to them.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Arguments {
    /// Bus to scan.
    #[arg(long, value_enum, default_value_t = Bus::Serial)]
    bus: Bus,

    /// Socket address of an instrument on the TCP/IP bus, e.g., 192.168.1.10:5025.
    #[arg(long = "tcp", value_name = "HOST:PORT")]
    sockets: Vec<String>,

    /// Baud rate for serial ports.
    #[arg(long, default_value_t = 9600)]
    baud: u32,

    /// Timeout in milliseconds.
    #[arg(long, default_value_t = 3000)]
    timeout: u64,

    /// Terminator for commands and responses, e.g., "\r\n". Defaults to "\n".
    #[arg(long)]
    termination: Option<String>,

    /// Query that instruments answer with their identification.
    #[arg(long, default_value = "*IDN?")]
    idn_query: String,

    /// Log verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    action: Action,
}

#[derive(Clone, Copy, ValueEnum)]
enum Bus {
    Tcp,
    Serial,
}

#[derive(Subcommand)]
enum Action {
    /// List all instruments whose identification contains IDENT
    List {
        /// Part of the identification or the resource address. Lists all if omitted.
        #[arg(default_value = "")]
        ident: String,
        /// Print the instruments as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Send a query to the first matching instrument and print the response
    Query {
        /// Part of the identification or the resource address.
        ident: String,
        /// Query to send.
        command: String,
    },
    /// Write a command to the first matching instrument
    Write {
        /// Part of the identification or the resource address.
        ident: String,
        /// Command to write.
        command: String,
    },
    /// Print the configuration keys with their defaults
    Config,
}

impl Arguments {
    fn plug_config(&self, ident: &str) -> PlugConfig {
        let mut config = PlugConfig::new(ident)
            .with_timeout(Duration::from_millis(self.timeout))
            .with_idn_query(&self.idn_query);
        if let Some(termination) = &self.termination {
            config = config.with_termination(&unescape(termination));
        }
        config
    }
}

/// Replace the escape sequences `\r`, `\n`, and `\t` that a shell passes on verbatim.
fn unescape(s: &str) -> String {
    s.replace("\\r", "\r")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}

/// Run the action of the arguments on the resource manager and print the results to `out`.
fn run<M: ResourceManager>(
    manager: &mut M,
    args: &Arguments,
    out: &mut impl Write,
) -> Result<(), VisaError> {
    match &args.action {
        Action::List { ident, json } => {
            let devices = find_devices(manager, &args.plug_config(ident))?;
            if *json {
                match serde_json::to_string_pretty(&devices) {
                    Ok(s) => writeln!(out, "{s}")?,
                    Err(err) => log::error!("Cannot serialize devices: {err}"),
                }
            } else {
                for device in devices {
                    writeln!(out, "{device}")?;
                }
            }
        }
        Action::Query { ident, command } => {
            let mut plug = VisaPlug::connect(manager, &args.plug_config(ident))?;
            let response = plug.query(&unescape(command));
            let closed = plug.tear_down();
            writeln!(out, "{}", response?)?;
            closed?;
        }
        Action::Write { ident, command } => {
            let mut plug = VisaPlug::connect(manager, &args.plug_config(ident))?;
            let written = plug.write(&unescape(command));
            let closed = plug.tear_down();
            written?;
            closed?;
        }
        Action::Config => {
            for key in PlugConfig::KEYS {
                writeln!(
                    out,
                    "{:<12} {:<8} {}",
                    key.name,
                    key.default.unwrap_or("required"),
                    key.description
                )?;
            }
        }
    }
    Ok(())
}

fn main() {
    let args = Arguments::parse();
    if args.verbose {
        let env = Env::default().default_filter_or("visaplug=debug,visascan=debug");
        env_logger::Builder::from_env(env).init();
    } else {
        env_logger::init();
    }

    let mut out = std::io::stdout().lock();
    let result = match args.bus {
        Bus::Tcp => match TcpIpResourceManager::new(&args.sockets) {
            Ok(mut manager) => run(&mut manager, &args, &mut out),
            Err(err) => Err(err),
        },
        Bus::Serial => run(&mut SerialResourceManager::new(args.baud), &args, &mut out),
    };

    if let Err(err) = result {
        eprintln!("{err}");
        exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;
    use visaplug::{LoopbackDevice, LoopbackResourceManager, LoopbackSession, ResourceSession};

    fn args(cmd: &[&str]) -> Arguments {
        Arguments::parse_from(std::iter::once("visascan").chain(cmd.iter().copied()))
    }

    /// Run a command line and return what it printed.
    fn output<M: ResourceManager>(
        manager: &mut M,
        cmd: &[&str],
    ) -> (Result<(), VisaError>, String) {
        let mut out = Vec::new();
        let result = run(manager, &args(cmd), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[fixture]
    fn bus() -> LoopbackResourceManager {
        LoopbackResourceManager::new()
            .with_device("GPIB0::01::INSTR", LoopbackDevice::new("ACME,Meter,SN1,1.0"))
            .with_device(
                "GPIB0::02::INSTR",
                LoopbackDevice::new("ACME,Source,SN2,1.0").with_response("VOLT?", "1.5"),
            )
    }

    /// A session whose close always fails.
    struct StuckSession(LoopbackSession);

    impl ResourceSession for StuckSession {
        fn write_raw(&mut self, data: &[u8]) -> Result<(), VisaError> {
            self.0.write_raw(data)
        }

        fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), VisaError> {
            self.0.read_exact(buf)
        }

        fn close(&mut self) -> Result<(), VisaError> {
            Err(VisaError::Io(std::io::Error::other("port is stuck")))
        }
    }

    /// A bus whose sessions cannot be closed.
    struct StuckBus(LoopbackResourceManager);

    impl ResourceManager for StuckBus {
        type Session = StuckSession;

        fn list_resources(&mut self) -> Result<Vec<String>, VisaError> {
            self.0.list_resources()
        }

        fn open_resource(
            &mut self,
            address: &str,
            timeout: Duration,
        ) -> Result<Self::Session, VisaError> {
            self.0.open_resource(address, timeout).map(StuckSession)
        }
    }

    #[rstest]
    #[case("\\r\\n", "\r\n")]
    #[case("\\n", "\n")]
    #[case("plain", "plain")]
    fn test_unescape(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(unescape(input), expected);
    }

    #[rstest]
    fn test_plug_config() {
        let args = args(&["--timeout", "500", "--termination", "\\r\\n", "config"]);
        let config = args.plug_config("SN1");
        assert_eq!(config.ident_code, "SN1");
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.termination.as_deref(), Some("\r\n"));
        assert_eq!(config.idn_query, "*IDN?");
    }

    #[rstest]
    fn test_list(mut bus: LoopbackResourceManager) {
        let (result, printed) = output(&mut bus, &["list", "ACME"]);
        result.unwrap();
        assert_eq!(
            printed,
            "GPIB0::01::INSTR: ACME,Meter,SN1,1.0\nGPIB0::02::INSTR: ACME,Source,SN2,1.0\n"
        );

        let (result, printed) = output(&mut bus, &["list", "Scope"]);
        assert!(matches!(result, Err(VisaError::DeviceNotFound { .. })));
        assert!(printed.is_empty());
    }

    #[rstest]
    fn test_list_json(mut bus: LoopbackResourceManager) {
        let (result, printed) = output(&mut bus, &["list", "Source", "--json"]);
        result.unwrap();
        let devices: serde_json::Value = serde_json::from_str(&printed).unwrap();
        assert_eq!(devices[0]["serial_number"], "SN2");
    }

    #[rstest]
    fn test_write_and_query(mut bus: LoopbackResourceManager) {
        output(&mut bus, &["write", "Source", "VOLT 1.5"]).0.unwrap();
        let (result, printed) = output(&mut bus, &["query", "SN2", "VOLT?"]);
        result.unwrap();
        assert_eq!(printed, "1.5\n");

        let source = bus.device("GPIB0::02::INSTR").unwrap();
        assert_eq!(source.written(), vec!["*IDN?", "VOLT 1.5", "*IDN?", "VOLT?"]);
        assert_eq!(source.times_closed(), 2);
    }

    /// The response is printed even if closing the connection fails afterwards.
    #[rstest]
    fn test_query_prints_response_before_close_error(bus: LoopbackResourceManager) {
        let mut bus = StuckBus(bus);
        let (result, printed) = output(&mut bus, &["query", "Source", "VOLT?"]);
        assert!(matches!(result, Err(VisaError::Io(_))));
        assert_eq!(printed, "1.5\n");
    }

    #[rstest]
    fn test_config(mut bus: LoopbackResourceManager) {
        let (result, printed) = output(&mut bus, &["config"]);
        result.unwrap();
        assert_eq!(printed.lines().count(), PlugConfig::KEYS.len());
        assert!(printed.starts_with("ident_code   required"));
    }
}
