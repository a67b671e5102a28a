//! Link em memória para os testes unitários.

use crate::protocol::{Message, encode_frame};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type Chunks = Arc<Mutex<VecDeque<Vec<u8>>>>;

/// Concatena os frames codificados das mensagens.
pub(crate) fn frames(messages: &[Message]) -> Vec<u8> {
    messages
        .iter()
        .flat_map(|m| encode_frame(m).unwrap())
        .collect()
}

/// Entrega os blocos alimentados um por leitura; sem dados, `TimedOut`
/// como uma serial com timeout.
pub(crate) struct ScriptedLink {
    incoming: Chunks,
    sent: Arc<Mutex<Vec<u8>>>,
    released: Arc<AtomicBool>,
}

/// Alimenta um [`ScriptedLink`] depois que ele foi movido para o canal.
pub(crate) struct Feeder {
    incoming: Chunks,
}

impl Feeder {
    pub(crate) fn feed(&self, bytes: &[u8]) {
        self.incoming.lock().unwrap().push_back(bytes.to_vec());
    }
}

impl ScriptedLink {
    pub(crate) fn new() -> Self {
        Self {
            incoming: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn feed(&self, bytes: &[u8]) {
        self.incoming.lock().unwrap().push_back(bytes.to_vec());
    }

    pub(crate) fn clone_feeder(&self) -> Feeder {
        Feeder {
            incoming: Arc::clone(&self.incoming),
        }
    }

    pub(crate) fn sent_handle(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.sent)
    }

    pub(crate) fn released_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl Read for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut incoming = self.incoming.lock().unwrap();
        let Some(mut chunk) = incoming.pop_front() else {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "sem dados"));
        };

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            incoming.push_front(chunk.split_off(n));
        }
        Ok(n)
    }
}

impl Write for ScriptedLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ScriptedLink {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Dispositivo que nunca para de transmitir: cada leitura entrega o mesmo
/// frame. Escritas são aceitas e descartadas.
pub(crate) struct StreamingLink {
    frame: Vec<u8>,
}

impl StreamingLink {
    pub(crate) fn new(message: &Message) -> Self {
        Self {
            frame: encode_frame(message).unwrap(),
        }
    }
}

impl Read for StreamingLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.frame.len().min(buf.len());
        buf[..n].copy_from_slice(&self.frame[..n]);
        Ok(n)
    }
}

impl Write for StreamingLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
