// Copyright (c) 2019-2024 The ringflow developers
//
// This program is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see  <http://www.gnu.org/licenses/>
//

//! Reading graphs in the adjacency-list text format.
//!
//! The format is line oriented:
//!
//! 1. the first line is `<num_vertices> <num_edges>` (decimal integers),
//! 2. line *i* + 2 describes the outgoing edges of vertex *i* as a
//!    whitespace-separated sequence of `<dest_vertex_id> <capacity>` pairs;
//!    a line may contain zero pairs,
//! 3. vertex `0` is the source and vertex `num_vertices - 1` the sink.
//!
//! While reading, the matching reverse reference is appended to the
//! destination vertex, so the returned vertices carry both edge lists.
//!
//! # Example
//!
//! ```
//! use ringflow::adjacency;
//! use std::io::Cursor;
//!
//! let instance = adjacency::read(Cursor::new("4 4\n1 3 2 2\n3 2\n3 4\n")).unwrap();
//! assert_eq!(instance.vertices.len(), 4);
//! assert_eq!(instance.num_edges, 4);
//! assert_eq!(instance.vertices[0].out_edges.len(), 2);
//! assert_eq!(instance.vertices[3].in_edges.len(), 2);
//! ```

use crate::graph::{GlobalId, InEdge, OutEdge, Vertex};

use num_traits::ToPrimitive;

use std::error;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};

/// Error when reading a file in adjacency-list format.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Format { line: usize, msg: String },
    Data { line: usize, msg: String },
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> std::result::Result<(), fmt::Error> {
        use self::Error::*;
        match self {
            Io(err) => err.fmt(fmt),
            Format { line, msg } => write!(fmt, "Format error on line {}: {}", line, msg),
            Data { line, msg } => write!(fmt, "Data error on line {}: {}", line, msg),
        }
    }
}

impl error::Error for Error {
    fn cause(&self) -> Option<&dyn error::Error> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A loaded, not yet partitioned instance.
pub struct Instance {
    /// All vertices, indexed by their global id.
    pub vertices: Vec<Vertex>,
    /// Number of edges promised by the header (and found in the body).
    pub num_edges: usize,
}

impl Instance {
    /// Global id of the source vertex.
    pub fn source(&self) -> GlobalId {
        0
    }

    /// Global id of the sink vertex.
    pub fn sink(&self) -> GlobalId {
        self.vertices.len() as GlobalId - 1
    }
}

/// Read an instance in adjacency-list format.
pub fn read<R: Read>(r: R) -> Result<Instance> {
    let mut lines = BufReader::new(r).lines();

    let header = lines.next().ok_or(Error::Format {
        line: 1,
        msg: "unexpected end of file, expected '<num_vertices> <num_edges>'".to_string(),
    })??;
    let mut toks = header.split_whitespace();
    let num_vertices: u64 = number(&mut toks, 1)?;
    let num_edges: usize = number(&mut toks, 1)?;
    if let Some(s) = toks.next() {
        return Err(Error::Format {
            line: 1,
            msg: format!("unexpected token at end of header: {}", s),
        });
    }
    if num_vertices == 0 {
        return Err(Error::Data {
            line: 1,
            msg: "graph must have at least one vertex".to_string(),
        });
    }
    if num_vertices.to_usize().is_none() {
        return Err(Error::Data {
            line: 1,
            msg: format!("vertex count {} exceeds the address space", num_vertices),
        });
    }

    let mut vertices: Vec<_> = (0..num_vertices).map(Vertex::new).collect();

    let mut nline = 1;
    let mut nedges = 0;
    let mut src: GlobalId = 0;
    for line in lines {
        let line = line?;
        nline += 1;
        if src >= num_vertices {
            // trailing blank lines are fine, anything else is not
            if line.split_whitespace().next().is_some() {
                return Err(Error::Format {
                    line: nline,
                    msg: format!("unexpected line (expected at most {} vertex lines)", num_vertices),
                });
            }
            continue;
        }

        let mut toks = line.split_whitespace();
        while let Some(tok) = toks.next() {
            let dest: GlobalId = tok.parse().map_err(|e| Error::Format {
                line: nline,
                msg: format!("{}", e),
            })?;
            let capacity: i32 = number(&mut toks, nline)?;
            if dest >= num_vertices {
                return Err(Error::Data {
                    line: nline,
                    msg: format!("invalid vertex id {} (must be in 0..{})", dest, num_vertices),
                });
            }
            if capacity < 0 {
                return Err(Error::Data {
                    line: nline,
                    msg: format!("negative capacity {} on edge ({},{})", capacity, src, dest),
                });
            }
            vertices[src as usize].out_edges.push(OutEdge::new(dest, capacity));
            vertices[dest as usize].in_edges.push(InEdge::new(src));
            nedges += 1;
        }
        src += 1;
    }

    if nedges != num_edges {
        return Err(Error::Data {
            line: nline,
            msg: format!("header promised {} edges, found {}", num_edges, nedges),
        });
    }

    Ok(Instance { vertices, num_edges })
}

/// Read an instance from a named file.
pub fn read_from_file(filename: &str) -> Result<Instance> {
    read(std::fs::File::open(filename)?)
}

fn number<'a, T, I>(toks: &mut I, line: usize) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    I: Iterator<Item = &'a str>,
{
    toks.next()
        .ok_or_else(|| Error::Format {
            line,
            msg: "expected number".to_string(),
        })?
        .parse()
        .map_err(|e| Error::Format {
            line,
            msg: format!("{}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_file_test() {
        let file = "6 7
1 10 2 10
3 4 4 8
4 9
5 10

3 6 5 10
";
        let instance = read(Cursor::new(file)).unwrap();
        assert_eq!(instance.vertices.len(), 6);
        assert_eq!(instance.num_edges, 7);
        assert_eq!(instance.source(), 0);
        assert_eq!(instance.sink(), 5);

        let mut arcs: Vec<_> = instance
            .vertices
            .iter()
            .flat_map(|v| v.out_edges.iter().map(move |e| (v.id, e.dest, e.capacity)))
            .collect();
        arcs.sort();
        assert_eq!(
            arcs,
            vec![
                (0, 1, 10),
                (0, 2, 10),
                (1, 3, 4),
                (1, 4, 8),
                (2, 4, 9),
                (4, 3, 6),
                (4, 5, 10),
            ]
        );

        // reverse references were materialized on the destination side
        assert_eq!(instance.vertices[4].in_edges.len(), 2);
        let mut srcs: Vec<_> = instance.vertices[4].in_edges.iter().map(|e| e.src).collect();
        srcs.sort();
        assert_eq!(srcs, vec![1, 2]);
    }

    #[test]
    fn vertex_line_may_be_empty() {
        let instance = read(Cursor::new("3 1\n\n2 9\n")).unwrap();
        assert_eq!(instance.vertices[0].out_edges.len(), 0);
        assert_eq!(instance.vertices[1].out_edges.len(), 1);
    }

    #[test]
    fn rejects_dangling_capacity() {
        match read(Cursor::new("2 1\n1\n")) {
            Err(Error::Format { line: 2, .. }) => {}
            other => panic!("expected format error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_out_of_range_destination() {
        match read(Cursor::new("2 1\n5 3\n")) {
            Err(Error::Data { line: 2, .. }) => {}
            other => panic!("expected data error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_edge_count_mismatch() {
        match read(Cursor::new("2 2\n1 3\n")) {
            Err(Error::Data { .. }) => {}
            other => panic!("expected data error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_negative_capacity() {
        match read(Cursor::new("2 1\n1 -3\n")) {
            Err(Error::Data { line: 2, .. }) => {}
            other => panic!("expected data error, got {:?}", other.map(|_| ())),
        }
    }
}
