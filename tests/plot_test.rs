// 该文件是 Detviz （检测可视化） 项目的一部分。
// tests/plot_test.rs - 绘图集成测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::PathBuf;

use detviz::plot::{
  Axes, FigSize, GridArgs, display_bboxes_mask, plot_boxes, plot_detection_vs_ground_truth,
  plot_grid, plot_mask,
};
use detviz::{Bbox, Mask, PlotError, PlotSettings};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba};
use ndarray::Array3;

const GRAY: Rgb<u8> = Rgb([100, 100, 100]);

fn temp_path(name: &str) -> PathBuf {
  let dir = std::env::temp_dir().join(format!("detviz-plot-{}", std::process::id()));
  std::fs::create_dir_all(&dir).unwrap();
  dir.join(name)
}

fn write_gray_image(name: &str, width: u32, height: u32) -> PathBuf {
  let path = temp_path(name);
  RgbImage::from_pixel(width, height, GRAY).save(&path).unwrap();
  path
}

#[test]
fn test_only_background_boxes_leave_image_unchanged() {
  let image = RgbImage::from_pixel(32, 32, GRAY);
  let boxes = vec![
    Bbox::annotation(1.0, 1.0, 20.0, 20.0, 0, "__background__"),
    Bbox::annotation(5.0, 5.0, 30.0, 30.0, 0, "__background__"),
  ];
  let out = plot_boxes(&image, &boxes, Some("title"), &PlotSettings::default());
  assert_eq!(out, image);
}

#[test]
fn test_empty_box_list_returns_copy() {
  let image = RgbImage::from_pixel(8, 8, GRAY);
  let out = plot_boxes(&image, &[], Some("title"), &PlotSettings::default());
  assert_eq!(out, image);
}

#[test]
fn test_zero_instance_mask_equals_rgba() {
  let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 4, GRAY));
  let mask = Mask::Instances(Array3::zeros((0, 4, 5)));
  let out = plot_mask(&image, &mask, &PlotSettings::without_font()).unwrap();
  assert_eq!(out, image.to_rgba8());
}

#[test]
fn test_half_alpha_blend() {
  let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([0, 0, 0])));
  let mut data = Array3::<u8>::zeros((1, 1, 1));
  data[[0, 0, 0]] = 1;
  let settings = PlotSettings::without_font().with_mask_color([200, 100, 50]);
  let out = plot_mask(&image, &Mask::Instances(data), &settings).unwrap();
  let px = out.get_pixel(0, 0);
  assert_eq!(px[3], 255);
  assert!((px[0] as i32 - 100).abs() <= 1);
  assert!((px[1] as i32 - 50).abs() <= 1);
  assert!((px[2] as i32 - 25).abs() <= 1);
}

#[test]
fn test_display_with_mask_file() {
  let im_path = write_gray_image("scene.png", 6, 4);
  let mask_path = temp_path("scene_mask.png");
  let mut mask = GrayImage::new(6, 4);
  mask.put_pixel(2, 1, Luma([3]));
  mask.save(&mask_path).unwrap();

  let settings = PlotSettings::without_font().with_mask_alpha(1.0);
  let mut ax = Axes::new(60, 40);
  let out = display_bboxes_mask(None, &im_path, Some(mask_path.as_path()), Some(&mut ax), &settings).unwrap();
  assert_eq!(out.get_pixel(2, 1), &Rgba([2, 166, 101, 255]));
  assert_eq!(out.get_pixel(0, 0), &Rgba([100, 100, 100, 255]));
  // 子图中显示了放大后的结果
  assert_eq!(ax.canvas().get_pixel(0, 0), &Rgb([100, 100, 100]));
}

#[test]
fn test_display_mask_size_mismatch() {
  let im_path = write_gray_image("mismatch.png", 6, 4);
  let mask_path = temp_path("mismatch_mask.png");
  GrayImage::new(4, 6).save(&mask_path).unwrap();

  let err = display_bboxes_mask(
    None,
    &im_path,
    Some(mask_path.as_path()),
    None,
    &PlotSettings::without_font(),
  )
  .unwrap_err();
  assert!(matches!(err, PlotError::MaskError(_)));
}

#[test]
fn test_detection_vs_ground_truth_colors() {
  let im_path = write_gray_image("versus.png", 40, 40);
  let det = vec![Bbox::detection(2.0, 2.0, 15.0, 15.0, 1, "can", 0.9)];
  let anno = vec![Bbox::annotation(20.0, 20.0, 35.0, 35.0, 1, "can")];
  let mut ax = Axes::new(40, 40);
  let settings = PlotSettings::without_font().with_rect_th(1);
  let out = plot_detection_vs_ground_truth(&im_path, &det, &anno, &mut ax, &settings).unwrap();
  assert_eq!(out.get_pixel(2, 2), &Rgb([255, 0, 0]));
  assert_eq!(out.get_pixel(20, 20), &Rgb([0, 255, 0]));
  assert_eq!(out.get_pixel(10, 10), &GRAY);
}

#[test]
fn test_detection_vs_ground_truth_keeps_text_small() {
  let im_path = write_gray_image("versus_text.png", 80, 80);
  let det = vec![Bbox::detection(2.0, 2.0, 60.0, 60.0, 1, "can", 0.9)];
  let anno = vec![Bbox::annotation(65.0, 65.0, 78.0, 78.0, 1, "can")];
  let mut ax = Axes::new(80, 80);
  let settings = PlotSettings::default().with_rect_th(1);
  let out = plot_detection_vs_ground_truth(&im_path, &det, &anno, &mut ax, &settings).unwrap();

  // 25 像素的类别名与标题会落在这里，1 像素的不会
  assert!((8..50).all(|x| (8..40).all(|y| out.get_pixel(x, y) == &GRAY)));

  let image = RgbImage::from_pixel(80, 80, GRAY);
  let large = plot_boxes(&image, &det, Some("versus_text.png"), &settings);
  assert!((8..50).any(|x| (8..40).any(|y| large.get_pixel(x, y) != &GRAY)));
}

#[test]
fn test_grid_exhaustion_is_reported() {
  let err = plot_grid(
    |_: &u8, _: &mut Axes| Ok(()),
    GridArgs::sequence(vec![1u8, 2]),
    1,
    3,
    FigSize::new(6.0, 1.0),
  )
  .unwrap_err();
  assert!(matches!(
    err,
    PlotError::GridArgsExhausted {
      filled: 2,
      total: 3
    }
  ));
}

#[test]
fn test_grid_of_images() {
  let paths: Vec<PathBuf> = (0..2)
    .map(|i| write_gray_image(&format!("grid_{}.png", i), 10, 10))
    .collect();
  let settings = PlotSettings::without_font();
  let out = plot_grid(
    |path: &PathBuf, ax: &mut Axes| {
      display_bboxes_mask(None, path, None, Some(ax), &settings).map(|_| ())
    },
    GridArgs::sequence(paths),
    1,
    2,
    FigSize::new(16.0, 1.0),
  )
  .unwrap();
  assert_eq!(out.dimensions(), (800, 400));
  assert_eq!(out.get_pixel(200, 200), &GRAY);
  assert_eq!(out.get_pixel(600, 200), &GRAY);
}
