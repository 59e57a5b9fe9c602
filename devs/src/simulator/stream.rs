//! Stream writers persist observation traces.  The wire format is the
//! writer's concern; both built-in writers emit line-delimited JSON, either
//! to a local file or to a distant socket.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::TcpStream;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::time::Time;
use crate::utils::errors::SimulationError;

/// One observed value, as handed to a stream writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRecord {
    pub time: Time,
    pub model: String,
    pub port: String,
    pub view: String,
    pub value: serde_yaml::Value,
}

/// The persistence contract of a view.  `open` is called once before the
/// first record, `close` once after the last.
pub trait StreamWriter {
    fn open(
        &mut self,
        plugin: &str,
        location: &str,
        file: &str,
        data: &serde_yaml::Value,
        time: Time,
    ) -> Result<(), SimulationError>;

    fn process(&mut self, record: &ObservationRecord) -> Result<(), SimulationError>;

    fn close(&mut self, time: Time) -> Result<(), SimulationError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamHeader<'a> {
    plugin: &'a str,
    data: &'a serde_yaml::Value,
    begin: Time,
}

#[derive(Serialize)]
struct StreamTrailer {
    end: Time,
}

fn not_open() -> SimulationError {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "stream writer is not open").into()
}

/// Writes the trace as JSON lines into `<location>/<file>.jsonl`.
#[derive(Default)]
pub struct LocalStreamWriter {
    out: Option<BufWriter<File>>,
}

impl LocalStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamWriter for LocalStreamWriter {
    fn open(
        &mut self,
        plugin: &str,
        location: &str,
        file: &str,
        data: &serde_yaml::Value,
        time: Time,
    ) -> Result<(), SimulationError> {
        let path = Path::new(location).join(format!("{file}.jsonl"));
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer(
            &mut out,
            &StreamHeader {
                plugin,
                data,
                begin: time,
            },
        )
        .map_err(std::io::Error::from)?;
        out.write_all(b"\n")?;
        self.out = Some(out);
        Ok(())
    }

    fn process(&mut self, record: &ObservationRecord) -> Result<(), SimulationError> {
        let out = self.out.as_mut().ok_or_else(not_open)?;
        serde_json::to_writer(&mut *out, record).map_err(std::io::Error::from)?;
        out.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self, time: Time) -> Result<(), SimulationError> {
        if let Some(mut out) = self.out.take() {
            serde_json::to_writer(&mut out, &StreamTrailer { end: time })
                .map_err(std::io::Error::from)?;
            out.write_all(b"\n")?;
            out.flush()?;
        }
        Ok(())
    }
}

/// Writes the same frames over a TCP connection; `location` is the
/// `host:port` of the collecting peer.
#[derive(Default)]
pub struct NetStreamWriter {
    stream: Option<TcpStream>,
}

impl NetStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamWriter for NetStreamWriter {
    fn open(
        &mut self,
        plugin: &str,
        location: &str,
        _file: &str,
        data: &serde_yaml::Value,
        time: Time,
    ) -> Result<(), SimulationError> {
        let mut stream = TcpStream::connect(location)?;
        serde_json::to_writer(
            &mut stream,
            &StreamHeader {
                plugin,
                data,
                begin: time,
            },
        )
        .map_err(std::io::Error::from)?;
        stream.write_all(b"\n")?;
        self.stream = Some(stream);
        Ok(())
    }

    fn process(&mut self, record: &ObservationRecord) -> Result<(), SimulationError> {
        let stream = self.stream.as_mut().ok_or_else(not_open)?;
        serde_json::to_writer(&mut *stream, record).map_err(std::io::Error::from)?;
        stream.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self, time: Time) -> Result<(), SimulationError> {
        if let Some(mut stream) = self.stream.take() {
            serde_json::to_writer(&mut stream, &StreamTrailer { end: time })
                .map_err(std::io::Error::from)?;
            stream.write_all(b"\n")?;
            stream.flush()?;
        }
        Ok(())
    }
}
