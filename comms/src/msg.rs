use std::{borrow::Cow, io};

use crate::{
    Deserialize, Serialize,
    specs::table::{Membership, TableShape},
};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const ERR_H: Header = 0;
const CONTROL_H: Header = 1;
const ADD_H: Header = 2;
const VALUES_H: Header = 3;

/// The numeric payload for the `Data` variant of the `Msg` enum.
#[derive(Debug)]
pub enum Payload<'a> {
    /// An addition into `table`, an empty `rows` addresses the whole table.
    Add {
        table: u32,
        rows: &'a [u32],
        values: &'a [f32],
    },
    /// The answer to a `Command::Get`.
    Values(&'a [f32]),
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Join,
    Welcome(Membership),
    NewTable(TableShape),
    TableCreated { table: u32 },
    Get { table: u32, rows: Option<Vec<u32>> },
    Barrier,
    Ack,
    Disconnect,
}

/// The application layer message for the entire system.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// Returns a short name of this message's kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(_) => "control",
            Msg::Data(Payload::Add { .. }) => "data/add",
            Msg::Data(Payload::Values(_)) => "data/values",
            Msg::Err(_) => "err",
        }
    }

    fn invalid_data<T>(text: String) -> io::Result<T> {
        Err(io::Error::new(io::ErrorKind::InvalidData, text))
    }

    fn buf_is_too_small<T>(size: usize, needed: usize) -> io::Result<T> {
        Self::invalid_data(format!(
            "The given buffer is too small {size}, must at least be {needed} bytes"
        ))
    }

    fn invalid_kind<T>(kind: Header) -> io::Result<T> {
        Self::invalid_data(format!("Received an invalid kind header {kind}"))
    }

    fn read_u32(buf: &[u8]) -> io::Result<(u32, &[u8])> {
        match buf.split_first_chunk::<4>() {
            Some((head, rest)) => Ok((u32::from_be_bytes(*head), rest)),
            None => Self::buf_is_too_small(buf.len(), 4),
        }
    }

    fn cast<T: bytemuck::Pod>(bytes: &[u8]) -> io::Result<&[T]> {
        bytemuck::try_cast_slice(bytes)
            .or_else(|e| Self::invalid_data(format!("Malformed numeric section: {e}")))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&ERR_H.to_be_bytes());
                Ok(Some(e.as_bytes()))
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&CONTROL_H.to_be_bytes());
                serde_json::to_writer(&mut *buf, cmd)?;
                Ok(None)
            }
            Msg::Data(Payload::Add {
                table,
                rows,
                values,
            }) => {
                buf.extend_from_slice(&ADD_H.to_be_bytes());
                buf.extend_from_slice(&table.to_be_bytes());
                buf.extend_from_slice(&(rows.len() as u32).to_be_bytes());
                buf.extend_from_slice(bytemuck::cast_slice(*rows));
                Ok(Some(bytemuck::cast_slice(*values)))
            }
            Msg::Data(Payload::Values(values)) => {
                buf.extend_from_slice(&VALUES_H.to_be_bytes());
                Ok(Some(bytemuck::cast_slice(*values)))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        let Some((kind, rest)) = buf.split_first_chunk::<HEADER_SIZE>() else {
            return Self::buf_is_too_small(buf.len(), HEADER_SIZE);
        };

        match Header::from_be_bytes(*kind) {
            ERR_H => {
                let text = std::str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(text)))
            }
            CONTROL_H => {
                let cmd = serde_json::from_slice(rest)?;
                Ok(Self::Control(cmd))
            }
            ADD_H => {
                let (table, rest) = Self::read_u32(rest)?;
                let (nrows, rest) = Self::read_u32(rest)?;

                let rows_len = nrows as usize * size_of::<u32>();
                if rest.len() < rows_len {
                    return Self::buf_is_too_small(rest.len(), rows_len);
                }

                let (rows, values) = rest.split_at(rows_len);
                let payload = Payload::Add {
                    table,
                    rows: Self::cast(rows)?,
                    values: Self::cast(values)?,
                };

                Ok(Self::Data(payload))
            }
            VALUES_H => Ok(Self::Data(Payload::Values(Self::cast(rest)?))),
            kind => Self::invalid_kind(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serializes `msg` into a 4 byte aligned buffer, the way a receiver would hold it.
    fn encode(msg: &Msg<'_>) -> (Vec<u32>, usize) {
        let mut head = Vec::new();
        let tail = msg.serialize(&mut head).unwrap().unwrap_or_default();

        let bytes: Vec<u8> = head.iter().chain(tail).copied().collect();
        let mut aligned = vec![0u32; bytes.len().div_ceil(4)];
        bytemuck::cast_slice_mut::<u32, u8>(&mut aligned)[..bytes.len()].copy_from_slice(&bytes);
        (aligned, bytes.len())
    }

    fn frame(encoded: &(Vec<u32>, usize)) -> &[u8] {
        &bytemuck::cast_slice::<u32, u8>(&encoded.0)[..encoded.1]
    }

    #[test]
    fn add_keeps_rows_and_values_apart() {
        let rows = [0, 5, 10];
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let msg = Msg::Data(Payload::Add {
            table: 7,
            rows: &rows,
            values: &values,
        });

        let buf = encode(&msg);
        let Msg::Data(Payload::Add {
            table,
            rows: got_rows,
            values: got_values,
        }) = Msg::deserialize(frame(&buf)).unwrap()
        else {
            panic!("expected an add payload");
        };

        assert_eq!(table, 7);
        assert_eq!(got_rows, rows);
        assert_eq!(got_values, values);
    }

    #[test]
    fn whole_table_add_has_no_rows() {
        let values = [0.5; 4];
        let msg = Msg::Data(Payload::Add {
            table: 0,
            rows: &[],
            values: &values,
        });

        let buf = encode(&msg);
        let Msg::Data(Payload::Add { rows, values, .. }) =
            Msg::deserialize(frame(&buf)).unwrap()
        else {
            panic!("expected an add payload");
        };

        assert!(rows.is_empty());
        assert_eq!(values, [0.5; 4]);
    }

    #[test]
    fn control_is_json() {
        let cmd = Command::Get {
            table: 3,
            rows: Some(vec![1, 2]),
        };

        let buf = encode(&Msg::Control(cmd.clone()));
        let Msg::Control(got) = Msg::deserialize(frame(&buf)).unwrap() else {
            panic!("expected a control message");
        };

        assert_eq!(got, cmd);
    }

    #[test]
    fn truncated_add_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&ADD_H.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&4u32.to_be_bytes());

        let err = Msg::deserialize(&buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let buf = 42u32.to_be_bytes();
        assert!(Msg::deserialize(&buf).is_err());
    }
}
