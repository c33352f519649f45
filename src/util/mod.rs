pub(crate) use self::equal_reader::EqualReader;
pub(crate) use self::messages_queue::MessagesQueue;
pub(crate) use self::refined_tcp_stream::RefinedTcpStream;
pub(crate) use self::sequential::{SequentialReader, SequentialReaderBuilder};
pub(crate) use self::sequential::{SequentialWriter, SequentialWriterBuilder};
pub(crate) use self::task_pool::TaskPool;

mod equal_reader;
mod messages_queue;
mod refined_tcp_stream;
mod sequential;
mod task_pool;
