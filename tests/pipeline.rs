mod common;

use common::{mock_context, test_config, write_image};
use depth_generate::{DepthGenError, ExecutionMode, Pipeline};

#[test]
fn converts_image_into_side_by_side_rgbd() {
	let dir = tempfile::tempdir().unwrap();
	let input = write_image(dir.path(), "beach.png", 2000, 1000);
	let export_dir = dir.path().join("3D Export");

	let pipeline = Pipeline::new(test_config(ExecutionMode::SingleFile, dir.path()), &export_dir);
	pipeline.ensure_export_dir().unwrap();
	assert_eq!(pipeline.config().mode, ExecutionMode::SingleFile);
	let (mut context, log) = mock_context(&[]);

	let output = pipeline.generate_depth(&mut context, &input).unwrap();
	assert_eq!(output, export_dir.join("beach_rgbd.jpg"));

	let frame = image::open(&output).unwrap();
	// 128px working square, height restored by 1/2, color and depth side by side.
	assert_eq!((frame.width(), frame.height()), (256, 64));

	let log = log.borrow();
	assert_eq!(log.depth_calls, vec![(128, 128, 560)]);
	assert!(log.sr_calls.is_empty());
	assert_eq!(log.releases, 1);
}

#[test]
fn small_images_go_through_cascade_first() {
	let dir = tempfile::tempdir().unwrap();
	let input = write_image(dir.path(), "thumb.png", 40, 30);

	let pipeline = Pipeline::new(test_config(ExecutionMode::SingleFile, dir.path()), dir.path());
	let (mut context, log) = mock_context(&[]);

	let output = pipeline.generate_depth(&mut context, &input).unwrap();
	let frame = image::open(&output).unwrap();
	assert_eq!((frame.width(), frame.height()), (340, 128));

	let log = log.borrow();
	assert_eq!(log.sr_calls, vec![(4, 40, 40)]);
	assert_eq!(log.depth_calls, vec![(128, 128, 560)]);
}

#[test]
fn single_mode_rejects_tagged_input_without_decoding() {
	let dir = tempfile::tempdir().unwrap();
	let input = write_image(dir.path(), "beach_rgbd.jpg", 64, 64);

	let pipeline = Pipeline::new(test_config(ExecutionMode::SingleFile, dir.path()), dir.path());
	let (mut context, log) = mock_context(&[]);

	let err = pipeline.generate_depth(&mut context, &input).unwrap_err();
	assert!(matches!(err, DepthGenError::InvalidInput(_)));
	assert!(log.borrow().depth_calls.is_empty());
}

#[test]
fn service_mode_converts_tagged_input() {
	let dir = tempfile::tempdir().unwrap();
	let input = write_image(dir.path(), "left_sbs.png", 64, 64);
	let export_dir = dir.path().join("out");
	std::fs::create_dir(&export_dir).unwrap();

	let pipeline = Pipeline::new(test_config(ExecutionMode::Service, dir.path()), &export_dir);
	let (mut context, _log) = mock_context(&[]);

	let output = pipeline.generate_depth(&mut context, &input).unwrap();
	assert_eq!(output, export_dir.join("left_sbs_rgbd.jpg"));
	assert!(output.is_file());
}

#[test]
fn unsupported_and_missing_inputs_are_invalid() {
	let dir = tempfile::tempdir().unwrap();
	let notes = dir.path().join("notes.txt");
	std::fs::write(&notes, b"hello").unwrap();

	let pipeline = Pipeline::new(test_config(ExecutionMode::SingleFile, dir.path()), dir.path());
	let (mut context, log) = mock_context(&[]);

	let err = pipeline.generate_depth(&mut context, &notes).unwrap_err();
	assert!(matches!(err, DepthGenError::InvalidInput(_)));

	let err = pipeline
		.generate_depth(&mut context, dir.path().join("gone.png"))
		.unwrap_err();
	assert!(matches!(err, DepthGenError::InvalidInput(_)));

	let err = pipeline.generate_depth(&mut context, "").unwrap_err();
	assert!(matches!(err, DepthGenError::InvalidInput(_)));

	assert!(log.borrow().depth_calls.is_empty());
}

#[test]
fn undecodable_image_fails_and_releases() {
	let dir = tempfile::tempdir().unwrap();
	let broken = dir.path().join("broken.png");
	std::fs::write(&broken, b"\x89PNG but not really").unwrap();

	let pipeline = Pipeline::new(test_config(ExecutionMode::SingleFile, dir.path()), dir.path());
	let (mut context, log) = mock_context(&[]);

	let err = pipeline.generate_depth(&mut context, &broken).unwrap_err();
	assert!(matches!(err, DepthGenError::Decode(_)));
	assert_eq!(log.borrow().releases, 1);
}

#[test]
fn inference_failure_propagates_and_releases() {
	let dir = tempfile::tempdir().unwrap();
	let input = write_image(dir.path(), "beach.png", 64, 64);

	let pipeline = Pipeline::new(test_config(ExecutionMode::SingleFile, dir.path()), dir.path());
	let (mut context, log) = mock_context(&[0]);

	let err = pipeline.generate_depth(&mut context, &input).unwrap_err();
	assert!(matches!(err, DepthGenError::Inference(_)));
	assert!(!dir.path().join("beach_rgbd.jpg").exists());
	assert_eq!(log.borrow().releases, 1);

	// The context stays usable for the next job.
	pipeline.generate_depth(&mut context, &input).unwrap();
	assert_eq!(log.borrow().releases, 2);
}

#[test]
fn existing_output_is_overwritten() {
	let dir = tempfile::tempdir().unwrap();
	let input = write_image(dir.path(), "beach.png", 64, 64);
	let stale = dir.path().join("beach_rgbd.jpg");
	std::fs::write(&stale, b"stale").unwrap();

	let pipeline = Pipeline::new(test_config(ExecutionMode::SingleFile, dir.path()), dir.path());
	let (mut context, _log) = mock_context(&[]);

	let output = pipeline.generate_depth(&mut context, &input).unwrap();
	assert_eq!(output, stale);
	assert!(image::open(&output).is_ok());
}

#[cfg(unix)]
#[test]
fn cubevi_inputs_become_clips() {
	use std::os::unix::fs::PermissionsExt;

	let dir = tempfile::tempdir().unwrap();
	let input = write_image(dir.path(), "portrait_cv.png", 64, 64);
	let config = test_config(ExecutionMode::SingleFile, dir.path());
	let binary_dir = config.binary_dir();
	std::fs::create_dir_all(&binary_dir).unwrap();
	let ffmpeg = binary_dir.join("ffmpeg");

	// Stand-in ffmpeg that touches its last argument.
	std::fs::write(&ffmpeg, "#!/bin/sh\nfor last; do :; done\ntouch \"$last\"\n").unwrap();
	std::fs::set_permissions(&ffmpeg, std::fs::Permissions::from_mode(0o755)).unwrap();

	let pipeline = Pipeline::new(config.clone(), dir.path());
	let (mut context, log) = mock_context(&[]);

	let output = pipeline.generate_depth(&mut context, &input).unwrap();
	assert_eq!(output, dir.path().join("portrait_cv.mp4"));
	assert!(output.is_file());
	assert!(log.borrow().depth_calls.is_empty());

	// A failing encoder is an encode failure, not a crash.
	std::fs::write(&ffmpeg, "#!/bin/sh\necho broken >&2\nexit 1\n").unwrap();
	let pipeline = Pipeline::new(config, dir.path());
	let err = pipeline.generate_depth(&mut context, &input).unwrap_err();
	assert!(matches!(err, DepthGenError::Encode(_)));
}
