use std::fs::{read, read_to_string, write};
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use colorful::Colorful;
use structopt::StructOpt;
use tracing::Level;

use chipo::asm::{assemble, listing, parse};
use chipo::disassemble;
use chipo::emu::{Addr, ProgramState};
use chipo::error::{ChipoError, Result};
use chipo_native::{run, RunConfig};

fn parse_addr(src: &str) -> std::result::Result<Addr, ParseIntError> {
    let digits = src
        .trim_start_matches("0x")
        .trim_start_matches('#');
    Addr::from_str_radix(digits, 16)
}

#[derive(StructOpt)]
#[structopt(name = "chipo", about = "CHIP-8 assembler, disassembler and emulator")]
struct Opt {
    /// Program to load, a `.s` source or a `.c8` binary
    #[structopt(long, short)]
    file: PathBuf,

    /// Only assemble or convert, do not open a window
    #[structopt(long, short)]
    no_run: bool,

    /// Writes the program as a `.c8` binary or a `.s` disassembly
    #[structopt(long, short)]
    out_file: Option<PathBuf>,

    /// Prints the assembly listing of a `.s` program
    #[structopt(long, short)]
    listing: bool,

    /// Instructions run per 60Hz tick, between 10 and 1000
    #[structopt(long, default_value = "20")]
    ipt: usize,

    /// Window pixels per high resolution pixel
    #[structopt(long, default_value = "5")]
    scale: u32,

    /// Stops when the program counter reaches this hex address
    #[structopt(long = "break", short = "b", parse(try_from_str = parse_addr))]
    breakpoints: Vec<Addr>,

    #[structopt(long, default_value = "warn")]
    log_level: Level,
}

fn file_name(file: &Path) -> String {
    file.to_string_lossy().to_string()
}

fn read_from_file(file: &Path, print_listing: bool) -> Result<Vec<u8>> {
    match file.extension().and_then(|ext| ext.to_str()) {
        Some("s") => {
            let source = read_to_string(file)?;
            let mut statements = parse(&source);
            let image = assemble(&mut statements);
            if print_listing {
                println!("{}", listing(&statements));
            }
            Ok(image?)
        }
        Some("c8") => Ok(read(file)?),
        _ => Err(ChipoError::InvalidFile(file_name(file))),
    }
}

fn write_to_file(file: &Path, image: &[u8]) -> Result<()> {
    match file.extension().and_then(|ext| ext.to_str()) {
        Some("s") => write(file, disassemble(image)?)?,
        Some("c8") => write(file, image)?,
        _ => return Err(ChipoError::InvalidFile(file_name(file))),
    }
    Ok(())
}

fn try_main(args: &Opt) -> Result<()> {
    let image = read_from_file(&args.file, args.listing)?;
    if let Some(out_path) = &args.out_file {
        write_to_file(out_path, &image)?;
    }

    if !args.no_run {
        let config = RunConfig {
            instructions_per_tick: args.ipt,
            scale: args.scale,
            breakpoints: args.breakpoints.clone(),
        };
        match run(&image, &config)? {
            ProgramState::Continue => {}
            state => println!("{}", state),
        }
    }

    Ok(())
}

fn main() {
    let args = Opt::from_args();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .init();

    match try_main(&args) {
        Ok(()) => {
            println!("chipo exited successfully!");
        }
        Err(ChipoError::Assembly(err)) => {
            let name = file_name(&args.file);
            for diagnostic in err.diagnostics.iter() {
                eprintln!("{}", format!("{}: {}", name, diagnostic).red());
            }
            eprintln!("{}", format!("error: {}", err).red());
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("{}", format!("error: {}", err).red());
            std::process::exit(1);
        }
    }
}
