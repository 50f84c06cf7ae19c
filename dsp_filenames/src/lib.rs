mod filename_handling;

pub use filename_handling::{
    available_destination, extension_or, frame_file_name, has_extension, prefixed_file_name,
    unique_label_name, CaseMatching, FilenameError,
};
