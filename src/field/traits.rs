/// Read access to a row-major 2D field.
pub trait FieldView {
    type Value: Copy;

    fn width(&self) -> usize;
    fn height(&self) -> usize;

    fn row(&self, y: usize) -> &[Self::Value];

    fn rows(&self) -> Rows<'_, Self>
    where
        Self: Sized,
    {
        Rows { field: self, y: 0 }
    }

    fn shape(&self) -> [usize; 2] {
        [self.height(), self.width()]
    }

    fn len(&self) -> usize {
        self.width() * self.height()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Rows<'a, F: ?Sized + FieldView> {
    field: &'a F,
    y: usize,
}

impl<'a, F: FieldView> Iterator for Rows<'a, F> {
    type Item = &'a [F::Value];

    fn next(&mut self) -> Option<Self::Item> {
        if self.y >= self.field.height() {
            return None;
        }
        let y = self.y;
        self.y += 1;
        Some(self.field.row(y))
    }
}
