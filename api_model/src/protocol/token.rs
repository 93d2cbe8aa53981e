use crate::err::Result;
use bytes::Bytes;
use std::io;

#[derive(Clone, Debug)]
pub enum Token {
    // +XXXX\r\n
    Simple(String),
    // -XXXX\r\n
    Error(String),
    // $<len>\r\n<raw bytes>\r\n
    Data(Bytes),
    // :XXXX\r\n
    Integer(u64),
    // ^\r\n
    Null,
}

fn find_crlf(input: &[u8]) -> Option<usize> {
    let mut i = 0usize;
    while i + 1 < input.len() {
        if input[i] == b'\r' && input[i + 1] == b'\n' {
            return Some(i);
        }
        i += 1;
    }
    None
}

impl Token {
    #[inline]
    fn to_string(bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
    }

    /// Convert this token to its wire-format bytes.
    /// Formats mirror the parser:
    /// - +<utf8>\r\n             for Simple
    /// - -<utf8>\r\n             for Error
    /// - $<len>\r\n<bytes>\r\n   for Data (len is decimal, so payloads are binary-safe)
    /// - :<u64>\r\n              for Integer
    /// - ^\r\n                   for Null
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Token::Simple(s) => {
                out.push(b'+');
                out.extend_from_slice(s.as_bytes());
            }
            Token::Error(s) => {
                out.push(b'-');
                out.extend_from_slice(s.as_bytes());
            }
            Token::Data(b) => {
                out.push(b'$');
                let mut buf = [0u8; lexical_core::BUFFER_SIZE];
                let slc = lexical_core::write(b.len() as u64, &mut buf);
                out.extend_from_slice(slc);
                out.extend_from_slice(b"\r\n");
                out.extend_from_slice(b);
            }
            Token::Integer(v) => {
                out.push(b':');
                let mut buf = [0u8; lexical_core::BUFFER_SIZE];
                let slc = lexical_core::write(*v, &mut buf);
                out.extend_from_slice(slc);
            }
            Token::Null => {
                out.push(b'^');
            }
        }
        out.extend_from_slice(b"\r\n");
        out
    }

    /// Parse a single token from the given byte slice.
    ///
    /// Returns `Ok(None)` when the buffer holds only a prefix of a token,
    /// so connection code can read more bytes and retry. A successful
    /// parse returns the token and the number of bytes consumed.
    pub fn parse_one(input: &[u8]) -> Result<Option<(Token, usize)>> {
        if input.is_empty() {
            return Ok(None);
        }
        let prefix = input[0];

        if prefix == b'$' {
            let Some(len_end) = find_crlf(&input[1..]) else {
                return Ok(None);
            };
            let len = match lexical_core::parse::<u64>(&input[1..1 + len_end]) {
                Ok(v) => v as usize,
                Err(e) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid data length: {:?}", e),
                    )
                    .into());
                }
            };
            let body_start = 1 + len_end + 2;
            let consumed = body_start + len + 2;
            if input.len() < consumed {
                return Ok(None);
            }
            if &input[body_start + len..consumed] != b"\r\n" {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "data token missing trailing CRLF",
                )
                .into());
            }
            let body = Bytes::copy_from_slice(&input[body_start..body_start + len]);
            return Ok(Some((Token::Data(body), consumed)));
        }

        let Some(end) = find_crlf(input) else {
            return Ok(None);
        };
        let body = &input[1..end];
        let consumed = end + 2;
        let token = match prefix {
            b'+' => Token::Simple(Self::to_string(body)?),
            b'-' => Token::Error(Self::to_string(body)?),
            b':' => match lexical_core::parse::<u64>(body) {
                Ok(v) => Token::Integer(v),
                Err(e) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid integer: {:?}", e),
                    )
                    .into());
                }
            },
            b'^' => {
                if end != 1 {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "null token must be exactly '^\\r\\n'",
                    )
                    .into());
                }
                Token::Null
            }
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown token prefix: {}", other as char),
                )
                .into());
            }
        };
        Ok(Some((token, consumed)))
    }

    /// Parse exactly `n` tokens from the front of `input`.
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold `n` complete
    /// tokens, and `Ok(Some((tokens, consumed)))` once it does.
    pub fn parse_exact(input: &[u8], n: usize) -> Result<Option<(Vec<Token>, usize)>> {
        let mut tokens = Vec::with_capacity(n);
        let mut idx = 0usize;
        while tokens.len() < n {
            match Self::parse_one(&input[idx..])? {
                Some((tok, used)) => {
                    tokens.push(tok);
                    idx += used;
                }
                None => return Ok(None),
            }
        }
        Ok(Some((tokens, idx)))
    }

    /// Parse all tokens from the input until exhaustion. A trailing
    /// partial token is an error here, unlike the incremental parsers.
    pub fn parse_all(input: &[u8]) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut idx: usize = 0;
        while idx < input.len() {
            match Self::parse_one(&input[idx..])? {
                Some((tok, used)) => {
                    tokens.push(tok);
                    idx += used;
                }
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "truncated token stream",
                    )
                    .into());
                }
            }
        }
        Ok(tokens)
    }
}
