use znpcoord_engine::DispatchTable;
use znpcoord_frame::Frame;

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_decoded, DecodedFrame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.frame)?;
    let frame = Frame::parse(&bytes).map_err(|err| frame_error("decode failed", err))?;

    let table = DispatchTable::default();
    let route = table.lookup(frame.class, frame.command).map(|route| route.name);
    let mut decoded = DecodedFrame::new(&frame, route);
    match table.route(&frame) {
        Ok(event) => decoded.event = Some(format!("{event:?}")),
        Err(err) => decoded.error = Some(err.to_string()),
    }

    print_decoded(&decoded, format);
    Ok(SUCCESS)
}
