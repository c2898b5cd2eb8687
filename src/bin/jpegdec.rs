//! jpegdec CLI - baseline JPEG decoder command-line utility.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use jpegdec_rs::bmp_writer::write_bmp;
use jpegdec_rs::{DecodedImage, DecoderOptions, Jpeg1Decoder};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Baseline sequential JPEG decoder
#[derive(Parser)]
#[command(name = "jpegdec")]
#[command(version)]
#[command(about = "Decode baseline JPEG images to BMP, PPM or raw RGB", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpegdec decode -i image.jpg -o image.bmp
    jpegdec decode -i image.jpg -o image.ppm -f ppm
    jpegdec -vv info -i image.jpg --tables")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a baseline JPEG image
    #[command(visible_alias = "d")]
    Decode {
        /// Input file path
        #[arg(short, long, help = "Path to the input JPEG file")]
        input: PathBuf,

        /// Output file path
        #[arg(short, long, help = "Path for the output file")]
        output: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "bmp", value_enum)]
        format: OutputFormat,

        /// Refuse images with more pixels than this
        #[arg(long)]
        max_pixels: Option<u64>,

        /// Fail on out-of-sequence restart markers instead of warning
        #[arg(long)]
        strict: bool,
    },

    /// Display frame metadata
    #[command(visible_alias = "i")]
    Info {
        /// Input file path
        #[arg(short, long, help = "Path to the JPEG file to inspect")]
        input: PathBuf,

        /// Also print quantization and Huffman tables
        #[arg(short, long)]
        tables: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// 24-bit Windows/OS2 bitmap
    Bmp,
    /// Portable PixMap (PPM/PGM) format
    Ppm,
    /// Raw interleaved RGB bytes
    Raw,
}

fn main() {
    let cli = Cli::parse();

    if let Ok(()) = log::set_logger(&LOGGER) {
        log::set_max_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        });
    }

    let result = match cli.command {
        Commands::Decode {
            input,
            output,
            format,
            max_pixels,
            strict,
        } => {
            let mut options = DecoderOptions::default().with_strict_restart_markers(strict);
            if let Some(max_pixels) = max_pixels {
                options = options.with_max_pixels(max_pixels);
            }
            decode_image(&input, &output, &format, options)
        }
        Commands::Info { input, tables } => show_info(&input, tables),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn decode_image(
    input: &PathBuf,
    output: &PathBuf,
    format: &OutputFormat,
    options: DecoderOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let image = Jpeg1Decoder::with_options(&data, options).decode()?;

    let file = BufWriter::new(fs::File::create(output)?);
    match format {
        OutputFormat::Bmp => write_bmp(file, &image)?,
        OutputFormat::Ppm => write_ppm(file, &image)?,
        OutputFormat::Raw => {
            let mut file = file;
            file.write_all(&image.to_rgb8())?;
            file.flush()?;
        }
    }

    println!(
        "Decoded {}x{} image ({} components) to {:?}",
        image.width(),
        image.height(),
        image.component_count(),
        output
    );
    Ok(())
}

fn show_info(input: &PathBuf, tables: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;

    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());
    println!();

    let mut decoder = Jpeg1Decoder::new(&data);
    let info = decoder.read_header()?;
    println!("Format: JPEG 1 ({:?})", info.frame_type);
    println!("  Dimensions: {}x{}", info.width, info.height);
    println!("  Bit depth:  {} bits", info.bits_per_sample);
    println!("  Components: {}", info.component_count);
    if info.restart_interval > 0 {
        println!("  Restart:    every {} MCUs", info.restart_interval);
    }

    for (plane, component) in decoder.header().frame_components() {
        println!(
            "  Component {}: sampling {}x{}, quantization table {}",
            plane.index() + 1,
            component.horizontal_sampling_factor,
            component.vertical_sampling_factor,
            component.quantization_table_id
        );
    }

    if tables {
        for (id, table) in decoder.quantization_tables().defined() {
            println!();
            println!("Quantization table {}:", id);
            for row in table.values().chunks(8) {
                let cells: Vec<String> = row.iter().map(|v| format!("{:4}", v)).collect();
                println!("  {}", cells.join(""));
            }
        }
        for (class, id, table) in decoder.huffman_tables().defined() {
            println!();
            println!(
                "Huffman {} table {} ({} symbols):",
                class.name(),
                id,
                table.symbol_count()
            );
            for length in 1..=16 {
                let symbols = table.symbols_of_length(length);
                if !symbols.is_empty() {
                    println!("  {:2}: {:02X?}", length, symbols);
                }
            }
        }
    }
    Ok(())
}

fn write_ppm<W: Write>(mut file: W, image: &DecodedImage) -> std::io::Result<()> {
    if image.component_count() == 1 {
        writeln!(file, "P5")?;
    } else {
        writeln!(file, "P6")?;
    }
    writeln!(file, "{} {}", image.width(), image.height())?;
    writeln!(file, "255")?;
    if image.component_count() == 1 {
        file.write_all(&image.to_luma8())?;
    } else {
        file.write_all(&image.to_rgb8())?;
    }
    file.flush()
}

/// A simple stderr logger.
static LOGGER: SimpleLogger = SimpleLogger;
struct SimpleLogger;
impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let target = if !record.target().is_empty() {
                record.target()
            } else {
                record.module_path().unwrap_or_default()
            };

            match record.level() {
                log::Level::Error => eprintln!("Error (in {}): {}", target, record.args()),
                log::Level::Warn => eprintln!("Warning (in {}): {}", target, record.args()),
                log::Level::Info => eprintln!("Info (in {}): {}", target, record.args()),
                log::Level::Debug => eprintln!("Debug (in {}): {}", target, record.args()),
                log::Level::Trace => eprintln!("Trace (in {}): {}", target, record.args()),
            }
        }
    }

    fn flush(&self) {}
}
