//! Line splitting and numeric field parsing shared by the text formats
use std::collections::VecDeque;
use std::io::{self, BufRead};

use nom::{
    bytes::complete::take_till1,
    character::complete::multispace0,
    multi::{count, many0},
    number::complete::float,
    sequence::preceded,
    IResult,
};

/// Iterator over the non-empty lines of a reader.
///
/// Both `\n` and `\r` terminate a line, so CRLF, LF and CR files all work.
/// Invalid UTF-8 is replaced rather than rejected.
pub(crate) struct Lines<R> {
    reader: R,
    buf: Vec<u8>,
    pending: VecDeque<String>,
}

impl<R: BufRead> Lines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(Ok(line));
            }
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    let chunk = String::from_utf8_lossy(&self.buf);
                    self.pending.extend(
                        chunk
                            .split(['\r', '\n'])
                            .filter(|line| !line.is_empty())
                            .map(str::to_owned),
                    );
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn word(input: &str) -> IResult<&str, &str> {
    preceded(multispace0, take_till1(char::is_whitespace))(input)
}

fn number(input: &str) -> IResult<&str, f32> {
    preceded(multispace0, float)(input)
}

/// Skip `skip` words, then read floats until the first non-number.
pub(crate) fn floats_after(input: &str, skip: usize) -> Vec<f32> {
    let parsed: IResult<&str, Vec<f32>> =
        preceded(count(word, skip), many0(number))(input);
    parsed.map(|(_, values)| values).unwrap_or_default()
}
