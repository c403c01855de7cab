/// Body-mass index rounded to one decimal place.
pub fn bmi_value(height_cm: f64, weight_kg: f64) -> f64 {
    let height_m = height_cm / 100.0;
    let bmi = weight_kg / (height_m * height_m);
    (bmi * 10.0).round() / 10.0
}

/// WHO category plus the badge color the frontend renders it with.
pub fn bmi_category(bmi: f64) -> (&'static str, &'static str) {
    if bmi < 18.5 {
        ("Underweight", "info")
    } else if bmi < 25.0 {
        ("Normal", "success")
    } else if bmi < 30.0 {
        ("Overweight", "warning")
    } else {
        ("Obese", "danger")
    }
}
