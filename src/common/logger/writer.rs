use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

/// Appends to a log file and periodically rewrites it so that only the newest
/// `max_lines` lines survive.
#[derive(Clone)]
pub struct PruningFileWriter {
    path: String,
    max_lines: u32,
    appended: Arc<AtomicU32>,
}

impl PruningFileWriter {
    pub fn new(path: String, max_lines: u32) -> Self {
        Self {
            path,
            max_lines,
            appended: Arc::new(AtomicU32::new(0)),
        }
    }

    fn prune(&self) -> io::Result<()> {
        if !Path::new(&self.path).exists() {
            return Ok(());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;

        if lines.len() > self.max_lines as usize {
            let keep = &lines[lines.len() - self.max_lines as usize..];
            let mut file = File::create(&self.path)?;
            for line in keep {
                writeln!(file, "{}", line)?;
            }
        }
        Ok(())
    }
}

impl io::Write for PruningFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(buf)?;

        // Prune once every 10% of max_lines (at least 50 lines) so the
        // rewrite stays off the hot path.
        let added = buf.iter().filter(|&&b| b == b'\n').count() as u32;
        let total = self.appended.fetch_add(added, Ordering::Relaxed) + added;
        let threshold = (self.max_lines / 10).max(50);
        if total >= threshold {
            self.appended.store(0, Ordering::Relaxed);
            if let Err(e) = self.prune() {
                eprintln!("Failed to prune log file {}: {}", self.path, e);
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for PruningFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
