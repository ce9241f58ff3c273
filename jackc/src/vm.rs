//! VM instruction writer.
//!
//! The target is a stack machine whose program is plain text, one
//! instruction per line. Each `write_*` call is pure formatting and
//! append; the caller is responsible for the correctness of segments,
//! indices and label names.
use std::{fmt, io};

/// Named memory region addressed by push/pop instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl fmt::Display for Segment {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Segment::Constant => write!(f, "constant"),
            Segment::Argument => write!(f, "argument"),
            Segment::Local    => write!(f, "local"),
            Segment::Static   => write!(f, "static"),
            Segment::This     => write!(f, "this"),
            Segment::That     => write!(f, "that"),
            Segment::Pointer  => write!(f, "pointer"),
            Segment::Temp     => write!(f, "temp"),
        }
    }
}

/// Arithmetic-logical stack commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VmCommand {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl fmt::Display for VmCommand {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VmCommand::Add => write!(f, "add"),
            VmCommand::Sub => write!(f, "sub"),
            VmCommand::Neg => write!(f, "neg"),
            VmCommand::Eq  => write!(f, "eq"),
            VmCommand::Gt  => write!(f, "gt"),
            VmCommand::Lt  => write!(f, "lt"),
            VmCommand::And => write!(f, "and"),
            VmCommand::Or  => write!(f, "or"),
            VmCommand::Not => write!(f, "not"),
        }
    }
}

/// Writes VM instructions as text lines to an output sink.
///
/// The writer exclusively owns the sink for the duration of one class's
/// compilation. [`finish`](VmWriter::finish) flushes and releases it;
/// dropping the writer early releases the sink without a guaranteed flush.
pub struct VmWriter<W: io::Write> {
    out: W,
}

impl<W: io::Write> VmWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_push(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        writeln!(self.out, "push {} {}", segment, index)
    }

    pub fn write_pop(&mut self, segment: Segment, index: u16) -> io::Result<()> {
        writeln!(self.out, "pop {} {}", segment, index)
    }

    pub fn write_arithmetic(&mut self, command: VmCommand) -> io::Result<()> {
        writeln!(self.out, "{}", command)
    }

    pub fn write_label(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "label {}", label)
    }

    pub fn write_goto(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "goto {}", label)
    }

    pub fn write_if(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.out, "if-goto {}", label)
    }

    pub fn write_call(&mut self, name: &str, n_args: u16) -> io::Result<()> {
        writeln!(self.out, "call {} {}", name, n_args)
    }

    pub fn write_function(&mut self, name: &str, n_locals: u16) -> io::Result<()> {
        writeln!(self.out, "function {} {}", name, n_locals)
    }

    pub fn write_return(&mut self) -> io::Result<()> {
        writeln!(self.out, "return")
    }

    /// Flush all written instructions and release the sink.
    ///
    /// No further writes are valid afterward, which the move of `self`
    /// makes unrepresentable.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn written(f: impl FnOnce(&mut VmWriter<&mut Vec<u8>>)) -> String {
        let mut buf = Vec::new();
        let mut writer = VmWriter::new(&mut buf);
        f(&mut writer);
        writer.finish().expect("flush");
        String::from_utf8(buf).expect("utf-8")
    }

    #[test]
    fn test_write_push_pop() {
        let text = written(|w| {
            w.write_push(Segment::Constant, 7).unwrap();
            w.write_pop(Segment::This, 0).unwrap();
            w.write_push(Segment::Pointer, 1).unwrap();
        });
        assert_eq!(text, "push constant 7\npop this 0\npush pointer 1\n");
    }

    #[test]
    fn test_write_branching() {
        let text = written(|w| {
            w.write_label("WHILE_COND_0").unwrap();
            w.write_if("WHILE_END_0").unwrap();
            w.write_goto("WHILE_COND_0").unwrap();
        });
        assert_eq!(
            text,
            "label WHILE_COND_0\nif-goto WHILE_END_0\ngoto WHILE_COND_0\n"
        );
    }

    #[test]
    fn test_write_subroutine() {
        let text = written(|w| {
            w.write_function("Main.main", 2).unwrap();
            w.write_call("Output.printInt", 1).unwrap();
            w.write_arithmetic(VmCommand::Not).unwrap();
            w.write_return().unwrap();
        });
        assert_eq!(
            text,
            "function Main.main 2\ncall Output.printInt 1\nnot\nreturn\n"
        );
    }
}
