mod device;
mod logging;

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{ArgAction, Args, Parser, Subcommand};

use device::ImageDevice;
use m65fdisk_core::disk::mbr::read_partition_table;
use m65fdisk_core::fs::fat32_ops::{for_each_entry, ShortName};
use m65fdisk_core::{
    create_contiguous_file, format_disk, has_gaps_between_files, verify_fat32,
    write_contiguous_file, Clock, CreatedFile, Fat32Volume, FormatConfig,
};

const CONFIRM_PHRASE: &str = "DELETE EVERYTHING";
const ROM_NAME: &str = "MEGA65.ROM";

#[derive(Debug, Parser)]
#[command(name = "m65fdisk")]
#[command(about = "Partition and format SD cards for the MEGA65")]
#[command(version)]
struct Cli {
    /// Block device or disk image
    #[arg(long, short = 'd', env = "SDCARDFILE", global = true)]
    device: Option<PathBuf>,

    /// More log output (repeat for trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the partition table
    Show,
    /// Write a fresh MBR, MEGA65 system partition and FAT32 volume
    Format(FormatArgs),
    /// Create a contiguous file in the root directory
    Create(CreateArgs),
    /// Check the FAT32 structures and list the root directory
    Verify,
}

#[derive(Debug, Args)]
struct FormatArgs {
    /// Skip the typed confirmation
    #[arg(long)]
    yes: bool,

    /// Copy this ROM image onto the card as MEGA65.ROM
    #[arg(long)]
    rom: Option<PathBuf>,

    /// Volume label (up to 11 characters)
    #[arg(long)]
    label: Option<String>,

    /// Use this sector count instead of the device size
    #[arg(long)]
    sectors: Option<u32>,

    /// Create a new image file of --sectors sectors first
    #[arg(long, requires = "sectors")]
    new_image: bool,

    /// Only write the structures, without zeroing the areas around them
    #[arg(long)]
    minimal: bool,
}

#[derive(Debug, Args)]
struct CreateArgs {
    /// 8.3 file name, e.g. MEGA65.D81
    name: String,

    /// Reserve this many bytes (suffix K or M accepted)
    #[arg(long, value_parser = parse_size, conflicts_with = "from", required_unless_present = "from")]
    size: Option<u32>,

    /// Copy the contents of this host file
    #[arg(long)]
    from: Option<PathBuf>,
}

/// Host wall clock for directory timestamps.
struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Option<NaiveDateTime> {
        Some(chrono::Local::now().naive_local())
    }
}

fn parse_size(raw: &str) -> Result<u32> {
    let (digits, scale) = match raw.as_bytes().last() {
        Some(b'K' | b'k') => (&raw[..raw.len() - 1], 1024),
        Some(b'M' | b'm') => (&raw[..raw.len() - 1], 1024 * 1024),
        _ => (raw, 1),
    };
    let value: u32 = digits
        .parse()
        .with_context(|| format!("`{raw}` is not a size"))?;
    value
        .checked_mul(scale)
        .ok_or_else(|| anyhow!("`{raw}` does not fit in 32 bits"))
}

fn device_path(cli: &Cli) -> Result<&Path> {
    cli.device
        .as_deref()
        .ok_or_else(|| anyhow!("no device given (use --device or set SDCARDFILE)"))
}

fn show_partitions(dev: &mut ImageDevice) -> Result<()> {
    match read_partition_table(dev).context("reading MBR")? {
        Some(mbr) => {
            for entry in mbr.entries.iter() {
                println!("{}", entry);
            }
        }
        None => println!("No valid MBR (missing 55 AA signature)"),
    }
    Ok(())
}

fn confirm(path: &Path) -> Result<()> {
    eprintln!("All data on {} will be destroyed.", path.display());
    eprint!("Type {CONFIRM_PHRASE} to continue: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    if line.trim_end() != CONFIRM_PHRASE {
        bail!("aborted, nothing was written");
    }
    Ok(())
}

fn report_file(file: &CreatedFile, volume: &Fat32Volume) {
    let sectors = file.sectors(volume);
    println!(
        "{}: {} bytes, cluster {}, {} clusters, sectors {}..{}",
        file.name, file.size, file.start_cluster, file.clusters, sectors.start, sectors.end
    );
}

fn run_format(path: &Path, args: FormatArgs) -> Result<()> {
    let mut dev = match (args.new_image, args.sectors) {
        (true, Some(sectors)) => ImageDevice::create(path, sectors)?,
        _ => ImageDevice::open(path, true)?,
    };

    println!("Current partition table:");
    show_partitions(&mut dev)?;
    if !args.yes {
        confirm(path)?;
    }

    let mut config = FormatConfig::default();
    if let Some(label) = &args.label {
        config = config.label(label);
    }
    if let Some(sectors) = args.sectors {
        config = config.sectors(sectors);
    }
    if args.minimal {
        config = config.minimal();
    }

    let report = format_disk(&mut dev, &config).context("formatting")?;
    let layout = &report.layout;
    println!(
        "FAT32 partition: {} MiB at sector {} ({} clusters, {} sectors per FAT)",
        layout.fat_size_mb(),
        layout.fat_partition_start,
        layout.fs_clusters,
        layout.fat_sectors
    );
    println!(
        "MEGA65 system partition: {} MiB at sector {} ({} freeze slots)",
        layout.sys_size_mb(),
        layout.sys_partition_start,
        report.system.slot_count()
    );

    if let Some(rom) = &args.rom {
        let data = std::fs::read(rom).with_context(|| format!("reading {}", rom.display()))?;
        let volume = Fat32Volume::from_layout(layout);
        let file = write_contiguous_file(&mut dev, &volume, ROM_NAME, &data, &SystemClock)
            .with_context(|| format!("writing {ROM_NAME}"))?;
        report_file(&file, &volume);
    }

    println!("New partition table:");
    show_partitions(&mut dev)
}

fn run_create(path: &Path, args: CreateArgs) -> Result<()> {
    let mut dev = ImageDevice::open(path, true)?;
    let volume = Fat32Volume::locate(&mut dev).context("opening FAT32 volume")?;

    let file = match (&args.from, args.size) {
        (Some(src), _) => {
            let data = std::fs::read(src).with_context(|| format!("reading {}", src.display()))?;
            write_contiguous_file(&mut dev, &volume, &args.name, &data, &SystemClock)
        }
        (None, Some(size)) => create_contiguous_file(&mut dev, &volume, &args.name, size, &SystemClock),
        (None, None) => bail!("either --size or --from is required"),
    }
    .with_context(|| format!("creating {}", args.name))?;

    report_file(&file, &volume);
    Ok(())
}

fn run_verify(path: &Path) -> Result<()> {
    let mut dev = ImageDevice::open(path, false)?;
    let volume = Fat32Volume::locate(&mut dev).context("opening FAT32 volume")?;
    let boot = verify_fat32(&mut dev, volume.partition_start).context("verifying FAT32")?;

    println!(
        "FAT32 volume \"{}\" OK: {} sectors, {} clusters",
        String::from_utf8_lossy(&boot.volume_label).trim_end(),
        boot.total_sectors,
        volume.cluster_count.saturating_sub(2)
    );

    for_each_entry(&mut dev, &volume, volume.root_cluster, |entry| {
        println!(
            "  {:<12} {:>10}  cluster {}",
            ShortName(entry.name).to_string(),
            entry.file_size,
            entry.first_cluster()
        );
    })
    .context("reading root directory")?;

    if has_gaps_between_files(&mut dev, &volume).context("scanning FAT")? {
        println!("Files are not packed: free clusters lie between allocated ones");
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    logging::init(logging::level_from(cli.verbose, cli.quiet)?)?;
    let path = device_path(&cli)?.to_path_buf();

    match cli.command {
        Commands::Show => {
            let mut dev = ImageDevice::open(&path, false)?;
            show_partitions(&mut dev)
        }
        Commands::Format(args) => run_format(&path, args),
        Commands::Create(args) => run_create(&path, args),
        Commands::Verify => run_verify(&path),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("128K").unwrap(), 0x20000);
        assert_eq!(parse_size("2m").unwrap(), 2 * 1024 * 1024);
        assert!(parse_size("8192M").is_err());
        assert!(parse_size("big").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::parse_from([
            "m65fdisk", "--device", "card.img", "format", "--yes", "--sectors", "524288",
            "--new-image",
        ]);
        assert_eq!(cli.device.as_deref(), Some(Path::new("card.img")));
        match cli.command {
            Commands::Format(args) => {
                assert!(args.yes);
                assert!(args.new_image);
                assert_eq!(args.sectors, Some(524_288));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_create_needs_a_size_source() {
        assert!(Cli::try_parse_from(["m65fdisk", "create", "A.BIN"]).is_err());
        assert!(Cli::try_parse_from(["m65fdisk", "create", "A.BIN", "--size", "1K"]).is_ok());
    }

    #[test]
    fn test_image_round_trip() {
        let path = std::env::temp_dir().join(format!("m65fdisk-main-{}.img", std::process::id()));
        let mut dev = ImageDevice::create(&path, 16_384).unwrap();
        let report = format_disk(&mut dev, &FormatConfig::default()).unwrap();
        let volume = Fat32Volume::from_layout(&report.layout);
        write_contiguous_file(&mut dev, &volume, ROM_NAME, &[0xEA; 1000], &SystemClock).unwrap();
        drop(dev);

        let mut dev = ImageDevice::open(&path, false).unwrap();
        let located = Fat32Volume::locate(&mut dev).unwrap();
        assert_eq!(located.partition_start, volume.partition_start);
        assert!(verify_fat32(&mut dev, located.partition_start).is_ok());
        std::fs::remove_file(&path).unwrap();
    }
}
