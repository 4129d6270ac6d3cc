use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProbeError;

/// Largest packet we accept from a status response.
pub const MAX_PACKET_LEN: i32 = 2 * 1024 * 1024;

pub fn write_varint(buffer: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0b0111_1111 == 0 {
            buffer.push(value as u8);
            return;
        }
        buffer.push((value & 0b0111_1111) as u8 | 0b1000_0000);
        value >>= 7;
    }
}

pub fn write_string(buffer: &mut Vec<u8>, value: &str) {
    write_varint(buffer, value.len() as i32);
    buffer.extend_from_slice(value.as_bytes());
}

pub async fn send_prefixed_packet<W>(connection: &mut W, data: &[u8]) -> Result<(), ProbeError>
where
    W: AsyncWrite + Unpin,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(data.len() + 5);
    write_varint(&mut buffer, data.len() as i32);
    buffer.extend_from_slice(data);

    connection.write_all(&buffer).await?;
    connection.flush().await?;

    Ok(())
}

pub async fn read_varint<R>(stream: &mut R) -> Result<i32, ProbeError>
where
    R: AsyncRead + Unpin,
{
    let mut res = 0;
    let mut count = 0u32;
    loop {
        let byte = stream.read_u8().await?;
        res |= ((byte & 0b0111_1111) as i32)
            .checked_shl(7 * count)
            .ok_or_else(|| ProbeError::unexpected("Unsupported protocol"))?;

        count += 1;
        if (byte & 0b1000_0000) == 0 {
            break Ok(res);
        } else if count >= 5 {
            break Err(ProbeError::unexpected("VarInt is too big"));
        }
    }
}

/// Read one length-prefixed packet, returning its id and body.
pub async fn read_packet<R>(stream: &mut R) -> Result<(i32, Vec<u8>), ProbeError>
where
    R: AsyncRead + Unpin,
{
    let len = read_varint(stream).await?;
    if !(1..=MAX_PACKET_LEN).contains(&len) {
        return Err(ProbeError::unexpected(format!("Invalid packet length {len}")));
    }
    let mut data = vec![0; len as usize];
    stream.read_exact(&mut data).await?;

    let mut body = data.as_slice();
    let packet_id = read_varint(&mut body).await?;
    Ok((packet_id, body.to_vec()))
}
