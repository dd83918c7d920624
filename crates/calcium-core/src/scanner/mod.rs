mod outputs;

pub use outputs::{collect_output_files, compile_patterns, relative_posix, OutputFile};
