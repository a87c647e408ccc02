//! Binary encoding implementation.

mod v1;
pub use v1::VERSION;

use crate::{Error, MAX_PAYLOAD_SIZE};
use binary_stream::{
    futures::{BinaryReader, BinaryWriter, Decodable, Encodable},
    Endian, Options,
};
use futures::io::{AsyncRead, AsyncSeek, AsyncWrite};
use std::io::Result;

pub(crate) fn encoding_error(
    e: impl std::error::Error + Send + Sync + 'static,
) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e)
}

/// Maximum buffer size for encoding and decoding.
pub(crate) const MAX_BUFFER_SIZE: usize = MAX_PAYLOAD_SIZE;

/// Identity bytes (DKGN)
const IDENTITY: [u8; 4] = [0x44, 0x4B, 0x47, 0x4E];

/// Encode message preamble.
async fn encode_preamble<W: AsyncWrite + AsyncSeek + Unpin + Send>(
    writer: &mut BinaryWriter<W>,
) -> Result<()> {
    writer.write_bytes(&IDENTITY).await?;
    writer.write_u16(&VERSION).await?;
    Ok(())
}

/// Decode message preamble.
async fn decode_preamble<R: AsyncRead + AsyncSeek + Unpin + Send>(
    reader: &mut BinaryReader<R>,
) -> Result<()> {
    let identity = reader.read_bytes(IDENTITY.len()).await?;
    if identity != IDENTITY {
        return Err(encoding_error(Error::BadEncodingIdentity));
    }

    let version = reader.read_u16().await?;
    if version != VERSION {
        return Err(encoding_error(Error::EncodingVersion(
            VERSION, version,
        )));
    }

    Ok(())
}

/// Default binary encoding options.
fn encoding_options() -> Options {
    Options {
        endian: Endian::Little,
        max_buffer_size: Some(MAX_BUFFER_SIZE),
    }
}

/// Encode to a binary buffer.
pub async fn encode(encodable: &impl Encodable) -> Result<Vec<u8>> {
    binary_stream::futures::encode(encodable, encoding_options())
        .await
}

/// Decode from a binary buffer.
pub async fn decode<T: Decodable + Default>(
    buffer: impl AsRef<[u8]>,
) -> Result<T> {
    binary_stream::futures::decode(
        buffer.as_ref(),
        encoding_options(),
    )
    .await
}

pub(crate) mod types {
    pub const TRANSPORT_INIT: u8 = 0;
    pub const TRANSPORT_INIT_RESHARE: u8 = 1;
    pub const TRANSPORT_EXCHANGE: u8 = 2;
    pub const TRANSPORT_OUTPUT: u8 = 3;
    pub const TRANSPORT_KYBER: u8 = 4;

    pub const KYBER_DEAL: u8 = 1;
    pub const KYBER_RESPONSE: u8 = 2;
    pub const KYBER_JUSTIFICATION: u8 = 3;
}
