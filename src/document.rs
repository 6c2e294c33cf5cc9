use std::fs::File;
use std::io::{self, Read, Write};

use failure::{Error, ResultExt};

use crate::naisd::NaisManifest;
use crate::naiserator::Application;

const DOCUMENT_SEPARATOR: &[u8] = b"---\n";

pub fn decode_manifest<R: Read>(input: R) -> Result<NaisManifest, Error> {
    Ok(serde_yaml::from_reader(input).context("decode input")?)
}

/// Reads the manifest from the named file, or from stdin when `input` is `-`.
pub fn read_manifest(input: &str) -> Result<NaisManifest, Error> {
    if input == "-" {
        let stdin = io::stdin();
        let handle = stdin.lock();
        decode_manifest(handle)
    } else {
        let file = File::open(input).with_context(|err| format!("open file {}: {}", input, err))?;
        decode_manifest(file)
    }
}

/// Writes the application as a single YAML document, always starting with a `---` line.
pub fn write_application<W: Write>(mut output: W, application: &Application) -> Result<(), Error> {
    let yaml = serde_yaml::to_string(application).context("encode output")?;
    let body = yaml.trim_start_matches("---\n");

    output.write_all(DOCUMENT_SEPARATOR)?;
    output.write_all(body.as_bytes())?;
    if !body.ends_with('\n') {
        output.write_all(b"\n")?;
    }
    output.flush()?;
    Ok(())
}
