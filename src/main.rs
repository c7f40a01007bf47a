//! Command-line front end for the YM loader and the resampling mixer.
//!
//! - `info` loads a song and prints its summary
//! - `frames` dumps the de-interleaved frame stream as CSV
//! - `resample` pushes a 16-bit stereo WAV through the ring buffer and
//!   resampler, one tick at a time

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ymplay_core::streaming::{
    Channels, OutputFormat, Panning, Resampler, SampleRing, SampleWidth,
};
use ymplay_core::ym_loader::load_file;
use ymplay_core::{NullChip, SongBody, SongDescriptor, YmMusic};

#[derive(Parser)]
#[command(name = "ymplay")]
#[command(about = "Inspect YM chiptune files and resample PCM streams")]
struct Args {
    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a song and print its header and metadata
    Info {
        /// YM/MIX/YMT file, packed or not
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Dump the frame stream as CSV, one row per frame
    Frames {
        /// YM/YMT file, packed or not
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resample a 16-bit stereo WAV file
    Resample {
        /// Source WAV (16-bit stereo PCM)
        input: PathBuf,

        /// Destination WAV
        output: PathBuf,

        /// Output sample rate in Hz
        #[arg(long)]
        rate: u32,

        /// Playback speed, 256 = 100 %
        #[arg(long, default_value_t = 256)]
        speed: u32,

        /// Pan, -64 (swapped) .. 0 (mono) .. 64 (normal)
        #[arg(long, default_value_t = 64, allow_negative_numbers = true)]
        pan: i8,

        /// Volume for both channels, 0..=256
        #[arg(long, default_value_t = 256)]
        volume: u16,

        /// Invert the left channel
        #[arg(long)]
        surround: bool,

        /// Output bits per sample (8 or 16)
        #[arg(long, default_value_t = 16)]
        bits: u16,

        /// Mix down to one channel
        #[arg(long)]
        mono: bool,

        /// Output frames per tick
        #[arg(long, default_value_t = 1024)]
        tick: usize,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Info { file, json } => run_info(&file, json),
        Command::Frames { file, output } => run_frames(&file, output.as_deref()),
        Command::Resample {
            input,
            output,
            rate,
            speed,
            pan,
            volume,
            surround,
            bits,
            mono,
            tick,
        } => {
            let width = match bits {
                8 => SampleWidth::Bits8,
                16 => SampleWidth::Bits16,
                other => bail!("--bits must be 8 or 16, got {}", other),
            };
            // WAV stores 8-bit unsigned; hound takes signed i8 and converts
            let format = OutputFormat {
                width,
                channels: if mono { Channels::Mono } else { Channels::Stereo },
                signed: true,
            };
            let panning = Panning::new(pan, volume, volume, surround)?;
            run_resample(&input, &output, rate, speed, panning, format, tick)
        }
    }
}

fn run_info(file: &Path, json: bool) -> Result<()> {
    let mut music = YmMusic::new(NullChip);
    music
        .load(file)
        .with_context(|| format!("Failed to load '{}'", file.display()))?;
    let song = music.song().context("no song after a successful load")?;
    let summary = song.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let meta = &summary.metadata;
    println!("File:      {}", file.display());
    println!("Type:      {} ({})", meta.song_type, meta.player);
    println!("Title:     {}", meta.name);
    println!("Author:    {}", meta.author);
    if !meta.comment.is_empty() {
        println!("Comment:   {}", meta.comment);
    }
    println!("Clock:     {} Hz", summary.clock);
    println!("Rate:      {} Hz", summary.player_rate);
    println!(
        "Frames:    {} (loop at {}, {} bytes each)",
        summary.frame_count, summary.loop_frame, summary.stream_stride
    );
    println!("Drums:     {}", summary.digidrums);
    if !summary.mix_blocks.is_empty() {
        println!("Blocks:    {}", summary.mix_blocks.len());
    }
    println!("Attribs:   {:#06x}", summary.attributes);
    let secs = summary.duration_ms / 1000;
    println!("Duration:  {}:{:02}", secs / 60, secs % 60);
    Ok(())
}

fn column_names(song: &SongDescriptor) -> Vec<String> {
    let columns = (0..song.stream_stride).map(|k| match song.body {
        SongBody::Tracker { .. } => format!("v{}_{}", k / 4, k % 4),
        _ => format!("r{}", k),
    });
    std::iter::once("frame".to_string()).chain(columns).collect()
}

fn run_frames(file: &Path, output: Option<&Path>) -> Result<()> {
    let song = load_file(file).with_context(|| format!("Failed to load '{}'", file.display()))?;
    if song.stream_stride == 0 {
        bail!("{} songs carry no frame stream", song.metadata.song_type);
    }

    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create '{}'", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(column_names(&song))?;
    for (index, frame) in song.frames().enumerate() {
        let row = std::iter::once(index.to_string()).chain(frame.iter().map(|b| b.to_string()));
        writer.write_record(row)?;
    }
    writer.flush()?;
    log::info!("wrote {} frames", song.frame_count);
    Ok(())
}

fn run_resample(
    input: &Path,
    output: &Path,
    rate: u32,
    speed: u32,
    panning: Panning,
    format: OutputFormat,
    tick: usize,
) -> Result<()> {
    let mut reader = hound::WavReader::open(input)
        .with_context(|| format!("Failed to open '{}'", input.display()))?;
    let spec = reader.spec();
    if spec.channels != 2
        || spec.bits_per_sample != 16
        || spec.sample_format != hound::SampleFormat::Int
    {
        bail!(
            "'{}' is {} channel(s) of {}-bit {:?}, expected 16-bit stereo PCM",
            input.display(),
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format
        );
    }
    let samples = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read samples")?;

    let mut resampler = Resampler::new(format, tick)?;
    resampler.set_speed(speed, spec.sample_rate, rate)?;
    resampler.set_panning(panning);
    // Room for a full tick even at steps above four source frames
    let mut ring = SampleRing::new(tick * 4 + resampler.source_frames_needed(tick))?;

    let bpf = format.bytes_per_frame();
    let mut device = vec![0u8; tick * 2 * bpf];
    let out_spec = hound::WavSpec {
        channels: match format.channels {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        },
        sample_rate: rate,
        bits_per_sample: match format.width {
            SampleWidth::Bits8 => 8,
            SampleWidth::Bits16 => 16,
        },
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output, out_spec)
        .with_context(|| format!("Failed to create '{}'", output.display()))?;

    let mut fed = 0usize;
    let mut total = 0usize;
    loop {
        if fed < samples.len() {
            fed += ring.write(&samples[fed..]) * 2;
        }
        resampler.set_source_ended(fed + 1 >= samples.len());

        let start = resampler.out_pos();
        let produced = resampler.process(&mut ring, &mut device, tick);
        drain_device(&device, start, produced, format, &mut writer)?;
        total += produced;

        if resampler.looped() {
            break;
        }
        if produced == 0 && ring.free() == 0 {
            bail!(
                "ring of {} frames too small for rate {:#x}",
                ring.capacity(),
                resampler.rate()
            );
        }
    }
    writer.finalize()?;
    log::info!(
        "{} source frames -> {} output frames at rate {:#x}",
        samples.len() / 2,
        total,
        resampler.rate()
    );
    Ok(())
}

fn drain_device<W: io::Write + io::Seek>(
    device: &[u8],
    start: usize,
    frames: usize,
    format: OutputFormat,
    writer: &mut hound::WavWriter<W>,
) -> Result<()> {
    let bpf = format.bytes_per_frame();
    let device_frames = device.len() / bpf;
    for i in 0..frames {
        let pos = (start + i) % device_frames;
        let bytes = &device[pos * bpf..(pos + 1) * bpf];
        match format.width {
            SampleWidth::Bits16 => {
                for sample in bytes.chunks_exact(2) {
                    writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
                }
            }
            SampleWidth::Bits8 => {
                for &byte in bytes {
                    writer.write_sample(byte as i8)?;
                }
            }
        }
    }
    Ok(())
}
