use std::{
    io::{self, BufRead, BufWriter, Write},
    path::Path,
};

use anyhow::{ensure, Context, Result};
use fgoxide::io::Io;
use seq_io::fasta::{Reader as FastaReader, Record as FastaRecord};

use crate::align::sequence::Sequence;

/// 1 MB buffer used for all file input and output.
pub const BUFFER_SIZE: usize = 1024 * 1024;

/// Converts the FASTA header (which may contain whitespaces) to a sequence name.
fn header_to_name(header: &[u8]) -> Result<String> {
    let header: std::borrow::Cow<str> = String::from_utf8_lossy(header);
    header
        .split_whitespace()
        .next()
        .map(std::string::ToString::to_string)
        .context("empty sequence name")
}

/// Reads every record from FASTA formatted input, in the order they occur.
pub fn read_fasta_from<R: BufRead>(reader: R) -> Result<Vec<Sequence>> {
    let source = FastaReader::with_capacity(reader, BUFFER_SIZE);
    let mut sequences = Vec::new();
    for record in source.into_records() {
        let record = record.context("Error reading FASTA")?;
        let name = header_to_name(record.head())?;
        sequences.push(Sequence::new(&name, record.seq()));
    }
    ensure!(!sequences.is_empty(), "Found no sequences in the FASTA");
    Ok(sequences)
}

/// Reads every record from the FASTA at the given path, which may be GZIP compressed.
pub fn read_fasta<P: AsRef<Path>>(path: &P) -> Result<Vec<Sequence>> {
    let fg_io: Io = Io::new(5, BUFFER_SIZE);
    let reader = fg_io
        .new_reader(path)
        .with_context(|| format!("Could not open {}", path.as_ref().display()))?;
    read_fasta_from(reader).with_context(|| format!("Could not read {}", path.as_ref().display()))
}

/// Writes the sequences as FASTA, one line of symbols per record.
pub fn write_fasta<W: Write>(writer: &mut W, sequences: &[Sequence]) -> Result<()> {
    for sequence in sequences {
        writeln!(writer, ">{}", sequence.name())?;
        writer.write_all(sequence.bases())?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Writes the sequences as FASTA to the given path, GZIP compressing if the path ends in `.gz`.
pub fn write_fasta_file<P: AsRef<Path>>(path: &P, sequences: &[Sequence]) -> Result<()> {
    let fg_io: Io = Io::new(5, BUFFER_SIZE);
    let mut writer = fg_io
        .new_writer(path)
        .with_context(|| format!("Could not create {}", path.as_ref().display()))?;
    write_fasta(&mut writer, sequences)?;
    writer.flush()?;
    Ok(())
}

/// Opens the given path for writing, GZIP compressing if the path ends in `.gz`, or standard
/// output if no path is given.
pub fn new_output<P: AsRef<Path>>(path: Option<&P>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let fg_io: Io = Io::new(5, BUFFER_SIZE);
            let writer = fg_io
                .new_writer(path)
                .with_context(|| format!("Could not create {}", path.as_ref().display()))?;
            Ok(Box::new(writer))
        }
        None => Ok(Box::new(BufWriter::with_capacity(BUFFER_SIZE, io::stdout()))),
    }
}
