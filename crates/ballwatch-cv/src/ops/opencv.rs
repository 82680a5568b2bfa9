//! OpenCV implementation of the image primitives

use crate::Result;
use crate::detection::config::CircleConfig;
use crate::sinks::{DrawCommand, Overlay};
use crate::traits::{ImageOps, RawCircle};
use anyhow::{Context, ensure};
use ballwatch_core::{BBox, Frame};
use opencv::{
    core::{self, CV_8UC4, Mat, Point, Rect, Scalar, Size, Vec3f, Vector},
    imgproc::{self, LINE_8},
    prelude::*,
};

/// Stroke width of drawn circles.
const CIRCLE_THICKNESS: i32 = 4;
/// Stroke width of drawn motion boxes.
const RECT_THICKNESS: i32 = 2;

/// Image primitives backed by OpenCV `Mat`s. Every intermediate `Mat` is
/// owned and released on drop, including on early error returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCvOps;

impl OpenCvOps {
    pub fn new() -> Self {
        Self
    }

    /// Copy an RGBA frame into a 4-channel `Mat`.
    pub fn frame_to_mat(frame: &Frame) -> Result<Mat> {
        frame.validate()?;

        let mut mat = Mat::new_rows_cols_with_default(
            frame.height() as i32,
            frame.width() as i32,
            CV_8UC4,
            Scalar::all(0.0),
        )?;
        mat.data_bytes_mut()?.copy_from_slice(frame.pixels());
        Ok(mat)
    }

    /// Copy a continuous 4-channel RGBA `Mat` into a frame.
    pub fn mat_to_frame(mat: &Mat, sequence: u64) -> Result<Frame> {
        ensure!(mat.typ() == CV_8UC4, "expected an 8-bit RGBA Mat, got type {}", mat.typ());
        let size = mat.size()?;
        let pixels = mat
            .data_bytes()
            .context("Mat is not continuous")?
            .to_vec();
        Ok(Frame::from_rgba(size.width as u32, size.height as u32, pixels, sequence))
    }

    /// Convert a camera `Mat` (BGR) into a frame.
    pub fn frame_from_bgr(mat: &Mat, sequence: u64) -> Result<Frame> {
        let mut rgba = Mat::default();
        imgproc::cvt_color(mat, &mut rgba, imgproc::COLOR_BGR2RGBA, 0)
            .context("BGR to RGBA conversion failed")?;
        Self::mat_to_frame(&rgba, sequence)
    }
}

impl ImageOps for OpenCvOps {
    type Buffer = Mat;

    fn grayscale(&self, frame: &Frame) -> Result<Mat> {
        let rgba = Self::frame_to_mat(frame)?;
        let mut gray = Mat::default();
        imgproc::cvt_color(&rgba, &mut gray, imgproc::COLOR_RGBA2GRAY, 0)
            .context("Grayscale conversion failed")?;
        Ok(gray)
    }

    fn abs_diff(&self, a: &Mat, b: &Mat) -> Result<Mat> {
        let mut diff = Mat::default();
        core::absdiff(a, b, &mut diff).context("Absolute difference failed")?;
        Ok(diff)
    }

    fn blur(&self, image: &Mat, kernel: i32, sigma: f64) -> Result<Mat> {
        let mut blurred = Mat::default();
        imgproc::gaussian_blur(
            image,
            &mut blurred,
            Size::new(kernel, kernel),
            sigma,
            sigma,
            core::BORDER_DEFAULT,
        )
        .context("Gaussian blur failed")?;
        Ok(blurred)
    }

    fn threshold(&self, image: &Mat, level: u8) -> Result<Mat> {
        let mut mask = Mat::default();
        imgproc::threshold(image, &mut mask, level as f64, 255.0, imgproc::THRESH_BINARY)
            .context("Threshold failed")?;
        Ok(mask)
    }

    fn find_regions(&self, mask: &Mat) -> Result<Vec<BBox>> {
        let mut contours: Vector<Vector<Point>> = Vector::new();
        imgproc::find_contours(
            mask,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .context("Contour extraction failed")?;

        let mut boxes = Vec::with_capacity(contours.len());
        for contour in contours.iter() {
            let rect = imgproc::bounding_rect(&contour)?;
            boxes.push(bbox_from_rect(rect));
        }
        Ok(boxes)
    }

    fn find_circles(&self, image: &Mat, params: &CircleConfig) -> Result<Vec<RawCircle>> {
        let mut circles: Vector<Vec3f> = Vector::new();
        imgproc::hough_circles(
            image,
            &mut circles,
            imgproc::HOUGH_GRADIENT,
            params.dp,
            params.min_distance,
            params.canny_threshold,
            params.accumulator_threshold,
            params.min_radius,
            params.max_radius,
        )
        .context("Hough circle detection failed")?;

        Ok(circles
            .iter()
            .map(|c| RawCircle {
                x: c[0],
                y: c[1],
                radius: c[2],
            })
            .collect())
    }
}

pub fn bbox_from_rect(rect: Rect) -> BBox {
    BBox::new(rect.x, rect.y, rect.width, rect.height)
}

pub fn bbox_to_rect(bbox: &BBox) -> Rect {
    Rect::new(bbox.x, bbox.y, bbox.width, bbox.height)
}

/// Draw the overlay onto a copy of `frame`: motion boxes in green, circles in
/// red.
pub fn render_overlay(frame: &Frame, overlay: &Overlay) -> Result<Frame> {
    let mut canvas = OpenCvOps::frame_to_mat(frame)?;
    let green = Scalar::new(0.0, 255.0, 0.0, 255.0);
    let red = Scalar::new(255.0, 0.0, 0.0, 255.0);

    for command in overlay.commands() {
        match *command {
            DrawCommand::Rect(bbox) => {
                imgproc::rectangle(
                    &mut canvas,
                    bbox_to_rect(&bbox),
                    green,
                    RECT_THICKNESS,
                    LINE_8,
                    0,
                )?;
            }
            DrawCommand::Circle { x, y, radius } => {
                imgproc::circle(
                    &mut canvas,
                    Point::new(x.round() as i32, y.round() as i32),
                    radius.round() as i32,
                    red,
                    CIRCLE_THICKNESS,
                    LINE_8,
                    0,
                )?;
            }
        }
    }

    OpenCvOps::mat_to_frame(&canvas, frame.sequence())
}
