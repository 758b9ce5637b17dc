use znpcoord_frame::Frame;

use crate::cmd::{parse_hex, EncodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = match args.payload.as_deref() {
        Some(hex) => parse_hex(hex)?,
        None => Vec::new(),
    };

    let frame = Frame::new(args.class, args.command, payload);
    let bytes = frame
        .encode()
        .map_err(|err| frame_error("encode failed", err))?;

    print_encoded(&bytes, format);
    Ok(SUCCESS)
}
