use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use gecko_profile_buffer::{
    decode_entries, BufferView, CounterDescription, Error, FastHashMap, NoMarkers,
    ProcessProfile, ProfiledThreadData, StreamingProps,
};

#[derive(Debug, Parser)]
#[command(
    name = "buffer2json",
    version,
    about = r#"
buffer2json reads a file of fixed-size profiler buffer entries and prints the
Gecko profile JSON for one thread.

EXAMPLES:
    # Print the thread with tid 1234:
    buffer2json entries.bin --tid 1234

    # Only include samples from the last part of the buffer, and wrap the
    # thread in a process object that also has counters and memory:
    buffer2json entries.bin --tid 1234 --since 5000 --pid 1234 -o thread.json
"#
)]
struct Opt {
    /// The file with the buffer entries, 9 bytes per entry.
    entries_file: PathBuf,

    /// The thread whose samples and markers should be streamed.
    #[arg(long)]
    tid: i32,

    /// The buffer position of the first entry in the file.
    #[arg(long, default_value_t = 0)]
    range_start: u64,

    /// Skip samples, markers and counter samples before this time, in ms.
    #[arg(long)]
    since: Option<f64>,

    /// The name of the thread in the output.
    #[arg(long)]
    thread_name: Option<String>,

    /// Wrap the thread in a process object with this pid. The process
    /// object also contains the counter, memory and overhead tables.
    #[arg(long)]
    pid: Option<u32>,

    /// A JSON file mapping counter ids to `{ name, category, description }`.
    #[arg(long, requires = "pid")]
    counters: Option<PathBuf>,

    /// Pretty-print the JSON.
    #[arg(long)]
    pretty: bool,

    /// Where to write the JSON. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let opt = Opt::parse();

    if let Err(err) = run(opt) {
        eprintln!("buffer2json: {err}");
        std::process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Error> {
    let mut data = Vec::new();
    BufReader::new(File::open(&opt.entries_file)?).read_to_end(&mut data)?;
    let entries = decode_entries(&data)?;
    log::info!(
        "Read {} entries from {}",
        entries.len(),
        opt.entries_file.display()
    );

    let props = StreamingProps {
        since_time: opt.since,
        thread_name: opt.thread_name,
        ..Default::default()
    };

    let view = BufferView::new(opt.range_start, &entries);
    let mut thread_data = ProfiledThreadData::new(opt.tid);
    let thread = thread_data.stream_json(&view, None, &NoMarkers, &props);

    let writer: Box<dyn Write> = match &opt.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);

    match opt.pid {
        Some(pid) => {
            let descriptions = match &opt.counters {
                Some(path) => read_counter_descriptions(path)?,
                None => FastHashMap::default(),
            };
            let process_name = format!("Process {pid}");
            let mut process = ProcessProfile::new(&process_name, pid);
            process.stream_process_tables(&view, &descriptions, &props);
            process.add_thread(thread);
            write_json(&mut writer, &process, opt.pretty)?;
        }
        None => write_json(&mut writer, &thread, opt.pretty)?,
    }

    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn read_counter_descriptions(path: &Path) -> Result<FastHashMap<u64, CounterDescription>, Error> {
    let file = BufReader::new(File::open(path)?);
    let by_string_key: FastHashMap<String, CounterDescription> = serde_json::from_reader(file)?;
    let mut descriptions = FastHashMap::default();
    for (key, description) in by_string_key {
        match parse_counter_id(&key) {
            Some(id) => {
                descriptions.insert(id, description);
            }
            None => log::warn!("Ignoring counter description with invalid id {key:?}"),
        }
    }
    Ok(descriptions)
}

/// Accepts decimal ids and `0x`-prefixed hex ids.
fn parse_counter_id(s: &str) -> Option<u64> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn write_json<W: Write, T: serde::Serialize>(
    writer: &mut W,
    value: &T,
    pretty: bool,
) -> Result<(), Error> {
    if pretty {
        serde_json::to_writer_pretty(writer, value)?;
    } else {
        serde_json::to_writer(writer, value)?;
    }
    Ok(())
}
