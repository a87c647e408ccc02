use async_trait::async_trait;
use binary_stream::futures::{
    BinaryReader, BinaryWriter, Decodable, Encodable,
};
use futures::io::{AsyncRead, AsyncSeek, AsyncWrite};
use std::io::Result;

use crate::{
    encoding::{decode_preamble, encode_preamble, encoding_error},
    Error, Exchange, Identifier, Init, KyberMessage, KyberMessageType,
    Output, SignedTransport, Transport, TransportType,
    BLS_PUBLIC_KEY_LEN, BLS_SIGNATURE_LEN, FORK_VERSION_LEN,
    IDENTIFIER_LEN, MAX_EXCHANGE_KEY_SIZE, MAX_OPERATORS,
    MAX_PAYLOAD_SIZE, MAX_SHARE_FIELD_SIZE, MAX_SIGNATURE_SIZE,
    MAX_WITHDRAWAL_CREDENTIALS_SIZE,
};

/// Version for binary encoding.
pub const VERSION: u16 = 1;

async fn encode_buffer<W: AsyncWrite + AsyncSeek + Unpin + Send>(
    writer: &mut BinaryWriter<W>,
    buffer: &[u8],
    limit: usize,
) -> Result<()> {
    if buffer.len() > limit {
        return Err(encoding_error(Error::PayloadTooLarge(
            buffer.len(),
            limit,
        )));
    }
    writer.write_u32(buffer.len() as u32).await?;
    writer.write_bytes(buffer).await?;
    Ok(())
}

async fn decode_buffer<R: AsyncRead + AsyncSeek + Unpin + Send>(
    reader: &mut BinaryReader<R>,
    limit: usize,
) -> Result<Vec<u8>> {
    let size = reader.read_u32().await? as usize;
    if size > limit {
        return Err(encoding_error(Error::PayloadTooLarge(size, limit)));
    }
    let buf = reader.read_bytes(size).await?;
    Ok(buf)
}

async fn decode_fixed<
    const N: usize,
    R: AsyncRead + AsyncSeek + Unpin + Send,
>(
    reader: &mut BinaryReader<R>,
    field: &'static str,
) -> Result<[u8; N]> {
    let buf = reader.read_bytes(N).await?;
    let len = buf.len();
    buf.try_into()
        .map_err(|_| encoding_error(Error::FieldLength(field, N, len)))
}

#[async_trait]
impl Encodable for Transport {
    async fn encode<W: AsyncWrite + AsyncSeek + Unpin + Send>(
        &self,
        writer: &mut BinaryWriter<W>,
    ) -> Result<()> {
        let id: u8 = (&self.kind).into();
        writer.write_u8(id).await?;
        writer.write_bytes(self.identifier.as_ref()).await?;
        encode_buffer(writer, &self.data, MAX_PAYLOAD_SIZE).await?;
        Ok(())
    }
}

#[async_trait]
impl Decodable for Transport {
    async fn decode<R: AsyncRead + AsyncSeek + Unpin + Send>(
        &mut self,
        reader: &mut BinaryReader<R>,
    ) -> Result<()> {
        let id = reader.read_u8().await?;
        self.kind = TransportType::try_from(id).map_err(encoding_error)?;
        let identifier: [u8; IDENTIFIER_LEN] =
            decode_fixed(reader, "identifier").await?;
        self.identifier = Identifier::from(identifier);
        self.data = decode_buffer(reader, MAX_PAYLOAD_SIZE).await?;
        Ok(())
    }
}

#[async_trait]
impl Encodable for SignedTransport {
    async fn encode<W: AsyncWrite + AsyncSeek + Unpin + Send>(
        &self,
        writer: &mut BinaryWriter<W>,
    ) -> Result<()> {
        encode_preamble(writer).await?;
        self.message.encode(writer).await?;
        writer.write_u64(self.signer).await?;
        encode_buffer(writer, &self.signature, MAX_SIGNATURE_SIZE)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Decodable for SignedTransport {
    async fn decode<R: AsyncRead + AsyncSeek + Unpin + Send>(
        &mut self,
        reader: &mut BinaryReader<R>,
    ) -> Result<()> {
        decode_preamble(reader).await?;
        self.message.decode(reader).await?;
        self.signer = reader.read_u64().await?;
        self.signature =
            decode_buffer(reader, MAX_SIGNATURE_SIZE).await?;
        Ok(())
    }
}

#[async_trait]
impl Encodable for Init {
    async fn encode<W: AsyncWrite + AsyncSeek + Unpin + Send>(
        &self,
        writer: &mut BinaryWriter<W>,
    ) -> Result<()> {
        if self.operators.len() > MAX_OPERATORS {
            return Err(encoding_error(Error::TooManyOperators(
                self.operators.len(),
                MAX_OPERATORS,
            )));
        }
        writer.write_u32(self.operators.len() as u32).await?;
        for operator in &self.operators {
            writer.write_u64(operator).await?;
        }
        writer.write_u64(self.threshold).await?;
        encode_buffer(
            writer,
            &self.withdrawal_credentials,
            MAX_WITHDRAWAL_CREDENTIALS_SIZE,
        )
        .await?;
        writer.write_bytes(&self.fork).await?;
        Ok(())
    }
}

#[async_trait]
impl Decodable for Init {
    async fn decode<R: AsyncRead + AsyncSeek + Unpin + Send>(
        &mut self,
        reader: &mut BinaryReader<R>,
    ) -> Result<()> {
        let size = reader.read_u32().await? as usize;
        if size > MAX_OPERATORS {
            return Err(encoding_error(Error::TooManyOperators(
                size,
                MAX_OPERATORS,
            )));
        }
        let mut operators = Vec::with_capacity(size);
        for _ in 0..size {
            operators.push(reader.read_u64().await?);
        }
        self.operators = operators;
        self.threshold = reader.read_u64().await?;
        self.withdrawal_credentials =
            decode_buffer(reader, MAX_WITHDRAWAL_CREDENTIALS_SIZE)
                .await?;
        self.fork = decode_fixed::<FORK_VERSION_LEN, _>(reader, "fork")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Encodable for Exchange {
    async fn encode<W: AsyncWrite + AsyncSeek + Unpin + Send>(
        &self,
        writer: &mut BinaryWriter<W>,
    ) -> Result<()> {
        encode_buffer(writer, &self.public_key, MAX_EXCHANGE_KEY_SIZE)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Decodable for Exchange {
    async fn decode<R: AsyncRead + AsyncSeek + Unpin + Send>(
        &mut self,
        reader: &mut BinaryReader<R>,
    ) -> Result<()> {
        self.public_key =
            decode_buffer(reader, MAX_EXCHANGE_KEY_SIZE).await?;
        Ok(())
    }
}

#[async_trait]
impl Encodable for KyberMessage {
    async fn encode<W: AsyncWrite + AsyncSeek + Unpin + Send>(
        &self,
        writer: &mut BinaryWriter<W>,
    ) -> Result<()> {
        let id: u8 = (&self.kind).into();
        writer.write_u8(id).await?;
        encode_buffer(writer, &self.data, MAX_PAYLOAD_SIZE).await?;
        Ok(())
    }
}

#[async_trait]
impl Decodable for KyberMessage {
    async fn decode<R: AsyncRead + AsyncSeek + Unpin + Send>(
        &mut self,
        reader: &mut BinaryReader<R>,
    ) -> Result<()> {
        let id = reader.read_u8().await?;
        self.kind =
            KyberMessageType::try_from(id).map_err(encoding_error)?;
        self.data = decode_buffer(reader, MAX_PAYLOAD_SIZE).await?;
        Ok(())
    }
}

#[async_trait]
impl Encodable for Output {
    async fn encode<W: AsyncWrite + AsyncSeek + Unpin + Send>(
        &self,
        writer: &mut BinaryWriter<W>,
    ) -> Result<()> {
        encode_buffer(writer, &self.encrypted_share, MAX_SHARE_FIELD_SIZE)
            .await?;
        encode_buffer(
            writer,
            &self.share_public_key,
            MAX_SHARE_FIELD_SIZE,
        )
        .await?;
        writer.write_bytes(&self.validator_public_key).await?;
        writer.write_bytes(&self.deposit_data_partial_signature).await?;
        Ok(())
    }
}

#[async_trait]
impl Decodable for Output {
    async fn decode<R: AsyncRead + AsyncSeek + Unpin + Send>(
        &mut self,
        reader: &mut BinaryReader<R>,
    ) -> Result<()> {
        self.encrypted_share =
            decode_buffer(reader, MAX_SHARE_FIELD_SIZE).await?;
        self.share_public_key =
            decode_buffer(reader, MAX_SHARE_FIELD_SIZE).await?;
        self.validator_public_key =
            decode_fixed::<BLS_PUBLIC_KEY_LEN, _>(
                reader,
                "validator_public_key",
            )
            .await?;
        self.deposit_data_partial_signature =
            decode_fixed::<BLS_SIGNATURE_LEN, _>(
                reader,
                "deposit_data_partial_signature",
            )
            .await?;
        Ok(())
    }
}
