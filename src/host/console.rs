use super::MetadataProvider;
use crate::core::{REGION_SIZE, RegionInfo, Result, StoreError};
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::str::FromStr;
use std::sync::Mutex;

const DEFAULT_GRID_COORD: i32 = 1000;
const DEFAULT_REGION_TYPE: &str = "Mainland";
const DEFAULT_OBJECT_CAPACITY: u32 = 50_000;

struct ConsoleIo<R, W> {
    input: R,
    output: W,
}

/// Asks an operator for region metadata, one field at a time, re-asking
/// until every answer parses. An empty answer keeps the shown default.
pub struct ConsoleMetadataProvider<R, W> {
    io: Mutex<ConsoleIo<R, W>>,
}

impl ConsoleMetadataProvider<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleMetadataProvider<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new(ConsoleIo { input, output }),
        }
    }

    /// Prints `prompt` and returns the trimmed answer, or `default` when the
    /// answer is empty.
    pub fn prompt(&self, prompt: &str, default: &str) -> Result<String> {
        let mut io = self.io.lock()?;
        io.ask(prompt, default)
    }

    pub fn into_inner(self) -> Result<(R, W)> {
        let io = self.io.into_inner()?;
        Ok((io.input, io.output))
    }
}

impl<R: BufRead, W: Write> ConsoleIo<R, W> {
    fn ask(&mut self, prompt: &str, default: &str) -> Result<String> {
        if default.is_empty() {
            write!(self.output, "{}: ", prompt)?;
        } else {
            write!(self.output, "{} [{}]: ", prompt, default)?;
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(StoreError::InputClosed);
        }
        let answer = line.trim();
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer.to_string()
        })
    }

    fn ask_text(&mut self, prompt: &str, default: &str) -> Result<String> {
        loop {
            let answer = self.ask(prompt, default)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            writeln!(self.output, "A value is required.")?;
        }
    }

    fn ask_parsed<T: FromStr>(&mut self, prompt: &str, default: T) -> Result<T>
    where
        T: ToString,
    {
        let default = default.to_string();
        loop {
            let answer = self.ask(prompt, &default)?;
            match answer.parse::<T>() {
                Ok(value) => return Ok(value),
                Err(_) => writeln!(self.output, "'{}' is not a valid value.", answer)?,
            }
        }
    }

    fn ask_bool(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let default = default.to_string();
        loop {
            let answer = self.ask(&format!("{} (true/false)", prompt), &default)?;
            match answer.to_lowercase().as_str() {
                "true" => return Ok(true),
                "false" => return Ok(false),
                _ => writeln!(self.output, "Please answer true or false.")?,
            }
        }
    }

    fn ask_positive(&mut self, prompt: &str, default: i32) -> Result<i32> {
        loop {
            let value = self.ask_parsed(prompt, default)?;
            if value > 0 {
                return Ok(value);
            }
            writeln!(self.output, "The value must be greater than zero.")?;
        }
    }

    /// Asks for a grid coordinate and returns it in base units.
    fn ask_grid_coord(&mut self, prompt: &str, default: i32) -> Result<i32> {
        loop {
            let value = self.ask_parsed(prompt, default)?;
            if let Some(units) = value.checked_mul(REGION_SIZE) {
                return Ok(units);
            }
            writeln!(self.output, "The value is out of range.")?;
        }
    }
}

impl<R, W> MetadataProvider for ConsoleMetadataProvider<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn resolve(&self, existing: Option<&RegionInfo>) -> Result<RegionInfo> {
        let mut info = existing.cloned().unwrap_or_default();
        let mut io = self.io.lock()?;

        info.region_name = io.ask_text("Region Name", &info.region_name)?;

        let (grid_x, grid_y) = info.grid_location();
        let grid_x = if info.loc_x == 0 { DEFAULT_GRID_COORD } else { grid_x };
        let grid_y = if info.loc_y == 0 { DEFAULT_GRID_COORD } else { grid_y };
        info.loc_x = io.ask_grid_coord("Region Location X", grid_x)?;
        info.loc_y = io.ask_grid_coord("Region Location Y", grid_y)?;

        info.size_x = io.ask_positive("Region size X", info.size_x)?;
        info.size_y = io.ask_positive("Region size Y", info.size_y)?;

        let region_type = if info.region_type.is_empty() {
            DEFAULT_REGION_TYPE
        } else {
            info.region_type.as_str()
        }
        .to_string();
        info.region_type = io.ask_text("Region Type", &region_type)?;

        info.see_into_from_neighbors =
            io.ask_bool("See into this sim from neighbors", info.see_into_from_neighbors)?;
        info.infinite_region = io.ask_bool("Make an infinite region", info.infinite_region)?;

        let capacity = if info.object_capacity == 0 {
            DEFAULT_OBJECT_CAPACITY
        } else {
            info.object_capacity
        };
        info.object_capacity = io.ask_parsed("Object capacity", capacity)?;

        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn provider(input: &str) -> ConsoleMetadataProvider<Cursor<Vec<u8>>, Vec<u8>> {
        ConsoleMetadataProvider::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_fresh_region_uses_defaults() {
        let console = provider("Sandbox\n\n\n\n\n\n\n\n\n");
        let info = console.resolve(None).unwrap();
        assert_eq!(info.region_name, "Sandbox");
        assert_eq!(info.grid_location(), (1000, 1000));
        assert_eq!(info.loc_x, 256_000);
        assert_eq!((info.size_x, info.size_y), (256, 256));
        assert_eq!(info.region_type, "Mainland");
        assert!(info.see_into_from_neighbors);
        assert!(!info.infinite_region);
        assert_eq!(info.object_capacity, 50_000);
    }

    #[test]
    fn test_reprompts_until_valid() {
        let console = provider("\nHarbour\nnorth\n1002\n999\n0\n512\n512\nEstate\nmaybe\nfalse\ntrue\n-5\n2000\n");
        let info = console.resolve(None).unwrap();
        assert_eq!(info.region_name, "Harbour");
        assert_eq!(info.grid_location(), (1002, 999));
        assert_eq!((info.size_x, info.size_y), (512, 512));
        assert_eq!(info.region_type, "Estate");
        assert!(!info.see_into_from_neighbors);
        assert!(info.infinite_region);
        assert_eq!(info.object_capacity, 2000);

        let (_, output) = console.into_inner().unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("A value is required."));
        assert!(output.contains("'north' is not a valid value."));
        assert!(output.contains("The value must be greater than zero."));
        assert!(output.contains("Please answer true or false."));
    }

    #[test]
    fn test_existing_values_seed_defaults() {
        let existing = RegionInfo::new("Old Name")
            .with_location(1005, 1006)
            .with_size(128, 128);
        let region_id = existing.region_id;
        let console = provider("New Name\n\n\n\n\n\n\n\n\n");
        let info = console.resolve(Some(&existing)).unwrap();
        assert_eq!(info.region_id, region_id);
        assert_eq!(info.region_name, "New Name");
        assert_eq!(info.grid_location(), (1005, 1006));
        assert_eq!(info.size_x, 128);
    }

    #[test]
    fn test_out_of_range_location_reprompts() {
        let console = provider("Big\n9000000\n1000\n-9000000\n\n\n\n\n\n\n\n");
        let info = console.resolve(None).unwrap();
        assert_eq!(info.grid_location(), (1000, 1000));
        assert_eq!(info.loc_x, 256_000);

        let (_, output) = console.into_inner().unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_eq!(output.matches("The value is out of range.").count(), 2);
    }

    #[test]
    fn test_closed_input() {
        let console = provider("Half\n1000\n");
        assert!(matches!(
            console.resolve(None),
            Err(StoreError::InputClosed)
        ));
    }
}
