use std::io::{self, Read, Write};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Hands out a sequence of `Read`ers over one underlying stream.
///
/// Each reader refuses to produce data until its predecessor has been
/// dropped, so the stream is consumed in the order the readers were created
/// even when they are moved to different threads.
pub(crate) struct SequentialReaderBuilder<R>
where
    R: Read + Send,
{
    reader: Arc<Mutex<R>>,
    next_trigger: Option<Receiver<()>>,
}

/// One slot in the sequence built by `SequentialReaderBuilder`.
pub(crate) struct SequentialReader<R>
where
    R: Read + Send,
{
    trigger: Option<Receiver<()>>,
    reader: Arc<Mutex<R>>,
    on_finish: Sender<()>,
}

/// Writer equivalent of `SequentialReaderBuilder`.
pub(crate) struct SequentialWriterBuilder<W>
where
    W: Write + Send,
{
    writer: Arc<Mutex<W>>,
    next_trigger: Option<Receiver<()>>,
}

/// One slot in the sequence built by `SequentialWriterBuilder`.
pub(crate) struct SequentialWriter<W>
where
    W: Write + Send,
{
    trigger: Option<Receiver<()>>,
    writer: Arc<Mutex<W>>,
    on_finish: Sender<()>,
}

impl<R: Read + Send> SequentialReaderBuilder<R> {
    pub fn new(reader: R) -> SequentialReaderBuilder<R> {
        SequentialReaderBuilder {
            reader: Arc::new(Mutex::new(reader)),
            next_trigger: None,
        }
    }

    pub fn next_reader(&mut self) -> SequentialReader<R> {
        let (on_finish, next_trigger) = channel();
        let trigger = self.next_trigger.replace(next_trigger);

        SequentialReader {
            trigger,
            reader: Arc::clone(&self.reader),
            on_finish,
        }
    }
}

impl<W: Write + Send> SequentialWriterBuilder<W> {
    pub fn new(writer: W) -> SequentialWriterBuilder<W> {
        SequentialWriterBuilder {
            writer: Arc::new(Mutex::new(writer)),
            next_trigger: None,
        }
    }

    pub fn next_writer(&mut self) -> SequentialWriter<W> {
        let (on_finish, next_trigger) = channel();
        let trigger = self.next_trigger.replace(next_trigger);

        SequentialWriter {
            trigger,
            writer: Arc::clone(&self.writer),
            on_finish,
        }
    }
}

impl<R: Read + Send> SequentialReader<R> {
    fn wait_for_turn(&mut self) {
        // a closed channel means the predecessor is gone as well
        if let Some(trigger) = self.trigger.take() {
            trigger.recv().ok();
        }
    }
}

impl<W: Write + Send> SequentialWriter<W> {
    fn wait_for_turn(&mut self) {
        if let Some(trigger) = self.trigger.take() {
            trigger.recv().ok();
        }
    }
}

impl<R: Read + Send> Read for SequentialReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.wait_for_turn();
        self.reader.lock().unwrap().read(buf)
    }
}

impl<W: Write + Send> Write for SequentialWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.wait_for_turn();
        self.writer.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.wait_for_turn();
        self.writer.lock().unwrap().flush()
    }
}

impl<R: Read + Send> Drop for SequentialReader<R> {
    fn drop(&mut self) {
        self.on_finish.send(()).ok();
    }
}

impl<W: Write + Send> Drop for SequentialWriter<W> {
    fn drop(&mut self) {
        self.on_finish.send(()).ok();
    }
}
