use std::io::{self, Write};

const ROW: usize = 16;

/// Writes `data` as rows of `offset: hex  |ascii|`.
pub fn hex_dump<W: Write + ?Sized>(out: &mut W, data: &[u8]) -> io::Result<()> {
    for (row, chunk) in data.chunks(ROW).enumerate() {
        write!(out, "{:08x}:", row * ROW)?;
        for i in 0..ROW {
            match chunk.get(i) {
                Some(b) => write!(out, " {:02x}", b)?,
                None => write!(out, "   ")?,
            }
        }
        write!(out, "  |")?;
        for &b in chunk {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' };
            write!(out, "{}", c)?;
        }
        writeln!(out, "|")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_row() {
        let mut out = Vec::new();
        hex_dump(&mut out, b"PING").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("00000000: 50 49 4e 47"));
        assert!(text.trim_end().ends_with("|PING|"));
    }

    #[test]
    fn test_rows_and_nonprintables() {
        let data: Vec<u8> = (0u8..20).collect();
        let mut out = Vec::new();
        hex_dump(&mut out, &data).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("00000010: 10 11 12 13"));
        assert!(lines[0].ends_with("|................|"));
    }

    #[test]
    fn test_empty_writes_nothing() {
        let mut out = Vec::new();
        hex_dump(&mut out, &[]).unwrap();
        assert!(out.is_empty());
    }
}
